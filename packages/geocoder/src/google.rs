//! Google Geocoding API client.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use georef_locality_models::Coordinate;

use crate::{GeocodeError, GeocodedPlace, Geocoder, GeocodingProvider, RateLimiter};

/// Google Geocoding API provider.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl GoogleGeocoder {
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            limiter,
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for GoogleGeocoder {
    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Google
    }

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
                ("address", query),
                ("region", region),
                ("key", self.api_key.as_str()),
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

/// Parses a Google Geocoding JSON response, keeping the first result.
pub(crate) fn parse_response(
    body: &serde_json::Value,
) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let status = body["status"].as_str().ok_or_else(|| GeocodeError::Parse {
        message: "Missing status in Google response".to_string(),
    })?;

    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "OVER_QUERY_LIMIT" => return Err(GeocodeError::RateLimited),
        other => {
            return Err(GeocodeError::Status {
                status: other.to_string(),
            });
        }
    }

    let Some(first) = body["results"].as_array().and_then(|results| results.first()) else {
        return Ok(None);
    };

    let location = &first["geometry"]["location"];
    let lat = location["lat"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Google response".to_string(),
    })?;
    let lng = location["lng"].as_f64().ok_or_else(|| GeocodeError::Parse {
        message: "Missing lng in Google response".to_string(),
    })?;

    let formatted_address = first["formatted_address"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let country_code = first["address_components"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|component| {
            component["types"]
                .as_array()
                .is_some_and(|types| types.iter().any(|t| t.as_str() == Some("country")))
        })
        .and_then(|component| component["short_name"].as_str())
        .map(str::to_ascii_uppercase);

    let location_type = first["geometry"]["location_type"]
        .as_str()
        .map(String::from);

    Ok(Some(GeocodedPlace {
        coordinate: Coordinate::new(lat, lng),
        formatted_address,
        country_code,
        location_type,
        provider: GeocodingProvider::Google,
    }))
}
