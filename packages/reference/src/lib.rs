#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading reference datasets from flat files.
//!
//! Supported inputs:
//! - **Farm registries**: one registered farm per row, filtered to a
//!   province
//! - **Gazetteers**: place names from mixed sources, each record's
//!   priority taken from the source-priority table
//! - **Source priorities**: `source,priority`
//! - **Province aliases**: `alias,province`
//!
//! Datasets are loaded once per batch and are read-only afterwards.

pub mod farms;
pub mod gazetteer;
pub mod tables;

use std::fs::File;
use std::path::{Path, PathBuf};

use georef_locality_models::{FeatureType, ReferenceDataset};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use farms::{FarmRegistryOptions, load_farm_registry, read_farm_registry};
pub use gazetteer::{GazetteerOptions, load_gazetteer, read_gazetteer};
pub use tables::{ProvinceAliases, SourcePriorities};

/// Errors from reference data loading.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// CSV parsing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path or label of the CSV source.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error opening or reading a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Reference file does not exist.
    #[error("Reference file not found: {0}")]
    MissingFile(String),

    /// A row that must be valid is not.
    #[error("Invalid row {line} in {path}: {message}")]
    InvalidRow {
        path: String,
        /// 1-based line number, header included.
        line: u64,
        message: String,
    },
}

/// Shape of a dataset file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetKind {
    FarmRegistry,
    Gazetteer,
}

/// One `[[datasets]]` entry of the batch config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Display name, recorded as the resolution source.
    pub name: String,
    pub kind: DatasetKind,
    pub path: PathBuf,
    /// Default category of the dataset's records.
    #[serde(default)]
    pub feature_type: FeatureType,
    /// Province filter for farm registries.
    #[serde(default)]
    pub province: Option<String>,
    /// Trust tier of a farm registry's records.
    #[serde(default = "default_priority")]
    pub priority: u32,
}

const fn default_priority() -> u32 {
    1
}

/// Lookup tables shared by every dataset of a batch.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub priorities: SourcePriorities,
    pub aliases: ProvinceAliases,
}

impl ReferenceTables {
    /// Loads whichever tables are configured; missing ones stay empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured table cannot be read.
    pub fn load(
        priorities: Option<&Path>,
        aliases: Option<&Path>,
    ) -> Result<Self, ReferenceError> {
        Ok(Self {
            priorities: priorities
                .map(SourcePriorities::from_path)
                .transpose()?
                .unwrap_or_default(),
            aliases: aliases
                .map(ProvinceAliases::from_path)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Loads one dataset.
///
/// # Errors
///
/// Returns an error if the dataset file is missing or unreadable.
pub fn load_dataset(
    spec: &DatasetSpec,
    tables: &ReferenceTables,
) -> Result<ReferenceDataset, ReferenceError> {
    log::debug!("Loading {} dataset '{}' from {}", spec.kind, spec.name, spec.path.display());

    let records = match spec.kind {
        DatasetKind::FarmRegistry => load_farm_registry(
            &spec.path,
            &FarmRegistryOptions {
                dataset: &spec.name,
                province: spec.province.as_deref(),
                aliases: &tables.aliases,
                priority: spec.priority,
            },
        )?,
        DatasetKind::Gazetteer => load_gazetteer(
            &spec.path,
            &GazetteerOptions {
                dataset: &spec.name,
                feature_type: spec.feature_type,
                priorities: &tables.priorities,
            },
        )?,
    };

    if records.is_empty() {
        log::warn!("Dataset '{}' has no usable records", spec.name);
    }

    Ok(ReferenceDataset::new(&spec.name, spec.feature_type).with_records(records))
}

/// Loads every dataset, keeping the configured order.
///
/// # Errors
///
/// Returns the first loading error.
pub fn load_datasets(
    specs: &[DatasetSpec],
    tables: &ReferenceTables,
) -> Result<Vec<ReferenceDataset>, ReferenceError> {
    specs.iter().map(|spec| load_dataset(spec, tables)).collect()
}

pub(crate) fn open_csv(path: &Path) -> Result<File, ReferenceError> {
    if !path.exists() {
        return Err(ReferenceError::MissingFile(path.display().to_string()));
    }

    File::open(path).map_err(|e| ReferenceError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
