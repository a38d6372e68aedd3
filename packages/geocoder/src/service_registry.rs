//! Geocoding providers a batch config can select by id.
//!
//! Each provider is described by a TOML file under `services/`, embedded at
//! compile time. [`service_by_id`] parses the one a batch config names
//! under `[geocoder] provider`.

use serde::Deserialize;

use crate::GeocodeError;

/// Embedded provider definitions, keyed by id.
const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("google", include_str!("../services/google.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

/// A geocoding provider definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeocodingService {
    /// Id used in the batch config.
    pub id: String,
    /// Name written to the log.
    pub name: String,
    pub provider: ProviderConfig,
}

/// Provider-specific settings, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Geocoding API.
    Google {
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
        #[serde(default)]
        rate_limit_ms: u64,
    },
    /// Nominatim / `OpenStreetMap` search.
    Nominatim { base_url: String, rate_limit_ms: u64 },
}

impl GeocodingService {
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Google { base_url, .. }
            | ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// Minimum delay between requests in milliseconds.
    #[must_use]
    pub const fn rate_limit_ms(&self) -> u64 {
        match &self.provider {
            ProviderConfig::Google { rate_limit_ms, .. }
            | ProviderConfig::Nominatim { rate_limit_ms, .. } => *rate_limit_ms,
        }
    }
}

/// Ids accepted by [`service_by_id`].
pub fn service_ids() -> impl Iterator<Item = &'static str> {
    SERVICE_TOMLS.iter().map(|(id, _)| *id)
}

/// Looks up a provider by id, ignoring case and surrounding whitespace.
///
/// Returns `Ok(None)` for an id no provider carries.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if the embedded definition does not
/// parse or names a different id than the one it is registered under.
pub fn service_by_id(id: &str) -> Result<Option<GeocodingService>, GeocodeError> {
    let wanted = id.trim();
    let Some((key, text)) = SERVICE_TOMLS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
    else {
        return Ok(None);
    };

    let service: GeocodingService = toml::from_str(text).map_err(|e| GeocodeError::Config {
        message: format!("Invalid definition for geocoder '{key}': {e}"),
    })?;

    if service.id != *key {
        return Err(GeocodeError::Config {
            message: format!("Geocoder registered as '{key}' is defined as '{}'", service.id),
        });
    }

    Ok(Some(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_provider_parses() {
        for id in service_ids() {
            let service = service_by_id(id).unwrap().unwrap();
            assert_eq!(service.id, id);
            assert!(!service.name.is_empty());
            assert!(service.base_url().starts_with("https://"));
        }
    }

    #[test]
    fn google_reads_its_key_from_the_environment() {
        let google = service_by_id("Google").unwrap().unwrap();
        assert!(matches!(
            google.provider,
            ProviderConfig::Google { ref api_key_env, .. } if api_key_env == "GOOGLE_MAPS_API_KEY"
        ));
    }

    #[test]
    fn nominatim_is_limited_to_one_request_per_second() {
        let nominatim = service_by_id(" nominatim ").unwrap().unwrap();
        assert_eq!(nominatim.rate_limit_ms(), 1000);
        assert!(matches!(nominatim.provider, ProviderConfig::Nominatim { .. }));
    }

    #[test]
    fn unknown_provider_is_none() {
        assert!(service_by_id("none").unwrap().is_none());
        assert!(service_by_id("bing").unwrap().is_none());
    }
}
