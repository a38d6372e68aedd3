#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! External geocoding for localities no reference dataset resolves.
//!
//! Providers are configured via TOML files in `services/` and looked up in
//! the [`service_registry`] by the id the batch config names:
//!
//! - `google`: **Google Geocoding API**, needs an API key in
//!   `GOOGLE_MAPS_API_KEY`.
//! - `nominatim`: **Nominatim / OpenStreetMap**, free with a 1 req/sec
//!   rate limit.
//!
//! Every provider implements [`Geocoder`] and returns the raw candidate;
//! deciding whether a result is specific enough to accept is left to the
//! caller.

pub mod google;
pub mod nominatim;
pub mod service_registry;

use std::time::Duration;

use georef_locality_models::Coordinate;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::service_registry::{GeocodingService, ProviderConfig};

/// User agent sent with every request. Nominatim's usage policy requires
/// an identifying agent.
pub const USER_AGENT: &str = concat!("specimen-georef/", env!("CARGO_PKG_VERSION"));

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    /// Point returned by the provider.
    pub coordinate: Coordinate,
    /// The provider's formatted address, e.g. `"Springbok, 8240, South
    /// Africa"`.
    pub formatted_address: String,
    /// ISO 3166 alpha-2 country code, upper-case.
    pub country_code: Option<String>,
    /// Provider precision label (`ROOFTOP`, `APPROXIMATE`, `village`, ...).
    pub location_type: Option<String>,
    /// Which provider resolved this place.
    pub provider: GeocodingProvider,
}

/// Which geocoding provider resolved a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GeocodingProvider {
    /// Google Geocoding API.
    Google,
    /// Nominatim / `OpenStreetMap`.
    Nominatim,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider answered with an error status.
    #[error("Geocoder returned status {status}")]
    Status {
        /// Status reported by the provider.
        status: String,
    },

    /// No answer within the allotted time.
    #[error("Geocoder timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// The provider cannot be set up.
    #[error("Geocoder configuration error: {message}")]
    Config {
        /// What is missing or wrong.
        message: String,
    },
}

/// A free-text geocoding oracle.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Which provider this is.
    fn provider(&self) -> GeocodingProvider;

    /// Geocodes `query`, biased towards `region` (ISO country code, e.g.
    /// `"za"`).
    ///
    /// Returns `Ok(None)` when the provider has no result.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the response cannot
    /// be parsed.
    async fn geocode(
        &self,
        query: &str,
        region: &str,
    ) -> Result<Option<GeocodedPlace>, GeocodeError>;
}

/// Enforces a minimum delay between consecutive requests.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until the next request may be sent and reserves that slot.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = next_slot.map_or(now, |slot| slot.max(now));
        *next_slot = Some(slot + self.interval);
        drop(next_slot);

        if slot > now {
            tokio::time::sleep_until(slot).await;
        }
    }
}

/// Builds the geocoder for a registry service.
///
/// The Google provider reads its API key from the environment variable
/// named in its service config.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if the API key is missing and
/// [`GeocodeError::Http`] if the HTTP client cannot be built.
pub fn create_geocoder(
    service: &GeocodingService,
    timeout: Duration,
) -> Result<Box<dyn Geocoder>, GeocodeError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?;
    let limiter = RateLimiter::new(Duration::from_millis(service.rate_limit_ms()));

    log::info!("Using geocoder '{}' ({})", service.name, service.base_url());

    match &service.provider {
        ProviderConfig::Google {
            base_url,
            api_key_env,
            ..
        } => {
            let api_key = std::env::var(api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| GeocodeError::Config {
                    message: format!("{api_key_env} environment variable not set"),
                })?;
            Ok(Box::new(google::GoogleGeocoder::new(
                client,
                base_url.clone(),
                api_key,
                limiter,
            )))
        }
        ProviderConfig::Nominatim { base_url, .. } => Ok(Box::new(
            nominatim::NominatimGeocoder::new(client, base_url.clone(), limiter),
        )),
    }
}
