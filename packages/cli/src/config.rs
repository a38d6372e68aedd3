//! Batch configuration loaded from `georef.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use georef_matcher::MatcherConfig;
use georef_reference::{DatasetKind, DatasetSpec};
use georef_resolver::batch::DEFAULT_CONCURRENCY;
use georef_resolver::{DEFAULT_GEOCODER_MAX_CONCURRENT, ResolverConfig};
use serde::Deserialize;
use thiserror::Error;

/// Provider id that disables the geocoder fallback.
pub const NO_GEOCODER: &str = "none";

/// Errors loading the batch configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config {path} lists no datasets")]
    NoDatasets { path: String },
}

/// Top-level `georef.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Province display name, e.g. `"Northern Cape"`.
    pub province: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_country_name")]
    pub country_name: String,
    /// Curator tag written to every output row.
    #[serde(default)]
    pub precision_by: String,
    /// Rows resolved at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Gazetteer source code to trust tier table.
    #[serde(default)]
    pub source_priorities: Option<PathBuf>,
    /// Province alias table.
    #[serde(default)]
    pub province_aliases: Option<PathBuf>,
    #[serde(default)]
    pub matching: MatcherConfig,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    /// Reference datasets, searched in this order.
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,
}

/// The `[geocoder]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeocoderSettings {
    /// Service id from the geocoder registry, or `"none"`.
    pub provider: String,
    pub timeout_secs: u64,
    /// Geocoder requests allowed in flight.
    pub max_concurrent: usize,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            timeout_secs: 10,
            max_concurrent: DEFAULT_GEOCODER_MAX_CONCURRENT,
        }
    }
}

impl GeocoderSettings {
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.provider.trim().eq_ignore_ascii_case(NO_GEOCODER)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_region() -> String {
    "za".to_string()
}

fn default_country_code() -> String {
    "ZA".to_string()
}

fn default_country_name() -> String {
    "South Africa".to_string()
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl BatchConfig {
    /// Reads and validates a config file. Relative dataset and table paths
    /// are resolved against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid
    /// TOML, or lists no datasets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: label.clone(),
            source: e,
        })?;

        let mut config = Self::parse(&text, &label)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }

        log::debug!(
            "Loaded {label}: {} datasets, geocoder '{}'",
            config.datasets.len(),
            config.geocoder.provider
        );

        Ok(config)
    }

    /// Parses config text; `label` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid TOML or lists no
    /// datasets.
    pub fn parse(text: &str, label: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: label.to_string(),
            source: e,
        })?;

        if config.datasets.is_empty() {
            return Err(ConfigError::NoDatasets {
                path: label.to_string(),
            });
        }

        // Farm registries without their own filter use the batch province.
        for spec in &mut config.datasets {
            if spec.kind == DatasetKind::FarmRegistry && spec.province.is_none() {
                spec.province = Some(config.province.clone());
            }
        }

        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        for spec in &mut self.datasets {
            join(&mut spec.path);
        }
        if let Some(path) = &mut self.source_priorities {
            join(path);
        }
        if let Some(path) = &mut self.province_aliases {
            join(path);
        }
    }

    /// Regional settings handed to the resolver.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            province: self.province.clone(),
            region: self.region.clone(),
            country_code: self.country_code.clone(),
            country_name: self.country_name.clone(),
            geocoder_timeout: self.geocoder.timeout(),
            geocoder_max_concurrent: self.geocoder.max_concurrent,
        }
    }
}
