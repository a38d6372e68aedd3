//! Nominatim / OpenStreetMap geocoder client.
//!
//! Used when no Google API key is available. Nominatim has strict rate
//! limits: **1 request per second** maximum (see `rate_limit_ms` in
//! `services/nominatim.toml`).
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use georef_locality_models::Coordinate;

use crate::{GeocodeError, GeocodedPlace, Geocoder, GeocodingProvider, RateLimiter};

/// Nominatim search provider.
#[derive(Debug)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl NominatimGeocoder {
    #[must_use]
    pub const fn new(client: reqwest::Client, base_url: String, limiter: RateLimiter) -> Self {
        Self {
            client,
            base_url,
            limiter,
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Nominatim
    }

    /// Free-form search restricted to `region` via `countrycodes`.
    async fn geocode(
        &self,
        query: &str,
        region: &str,
    ) -> Result<Option<GeocodedPlace>, GeocodeError> {
        self.limiter.acquire().await;

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("countrycodes", region),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses Nominatim JSON response.
pub(crate) fn parse_response(
    body: &serde_json::Value,
) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let formatted_address = first["display_name"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let country_code = first["address"]["country_code"]
        .as_str()
        .map(str::to_ascii_uppercase);

    let location_type = first["addresstype"]
        .as_str()
        .or_else(|| first["type"].as_str())
        .map(String::from);

    Ok(Some(GeocodedPlace {
        coordinate: Coordinate::new(lat, lon),
        formatted_address,
        country_code,
        location_type,
        provider: GeocodingProvider::Nominatim,
    }))
}
