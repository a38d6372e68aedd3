#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolves one specimen locality label to a coordinate.
//!
//! Each row walks a fixed sequence of states and stops at the first one
//! that produces a terminal result:
//!
//! 1. **Validate** the QDS code (malformed rows never reach matching)
//! 2. **Normalize** the label text
//! 3. **Extract** an embedded "`<d> km <bearing> of <place>`" offset
//! 4. **Empty check**: nothing left to look up keeps the input coordinate
//! 5. **Detect farm** phrasing and pick the expected feature type
//! 6. **Degree literal**: coordinates written inside the label win
//! 7. **Datasets**, in configured order, then apply the offset
//! 8. **Geocoder**, accepted only inside the configured country and below
//!    province level, then apply the offset
//!
//! Rows are independent; [`batch::resolve_batch`] runs many concurrently.

pub mod batch;
pub mod progress;

use std::sync::Arc;
use std::time::Duration;

use georef_geocoder::{GeocodeError, GeocodedPlace, Geocoder};
use georef_geodesy::{apply_direction, distance_km};
use georef_locality::{
    AnchorForm, FarmDetection, detect_farm, extract_direction, implicit_farm_name, normalize,
    parse_degree_literal,
};
use georef_locality_models::{
    Coordinate, Direction, FeatureType, Qds, QdsError, ReferenceDataset, ResolutionResult,
    ResolutionSource,
};
use georef_matcher::{MatchQuery, ReferenceMatcher};
use tokio::sync::Semaphore;

/// Default geocoder timeout.
pub const DEFAULT_GEOCODER_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of geocoder requests allowed in flight.
pub const DEFAULT_GEOCODER_MAX_CONCURRENT: usize = 4;

/// Regional settings for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Province display name appended to geocoder queries.
    pub province: String,
    /// Geocoder region bias (ISO code, lower-case).
    pub region: String,
    /// Country code a geocoder result must carry to be accepted.
    pub country_code: String,
    /// Country display name, used to recognise province-level answers.
    pub country_name: String,
    pub geocoder_timeout: Duration,
    pub geocoder_max_concurrent: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            province: "Northern Cape".to_string(),
            region: "za".to_string(),
            country_code: "ZA".to_string(),
            country_name: "South Africa".to_string(),
            geocoder_timeout: DEFAULT_GEOCODER_TIMEOUT,
            geocoder_max_concurrent: DEFAULT_GEOCODER_MAX_CONCURRENT,
        }
    }
}

impl ResolverConfig {
    /// The formatted address a geocoder returns when it only recognised the
    /// province, e.g. `"Northern Cape, South Africa"`.
    #[must_use]
    pub fn province_level_address(&self) -> String {
        format!("{}, {}", self.province, self.country_name)
    }
}

/// One row of the input table.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    /// Free-text locality label.
    pub locality: String,
    /// QDS code as written.
    pub qds: String,
    /// Coordinate already attached to the record, if any.
    pub coordinate: Option<Coordinate>,
}

impl InputRow {
    #[must_use]
    pub fn new(locality: impl Into<String>, qds: impl Into<String>) -> Self {
        Self {
            locality: locality.into(),
            qds: qds.into(),
            coordinate: None,
        }
    }

    #[must_use]
    pub const fn with_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }
}

/// Builds the terminal result for a row whose QDS could not be parsed.
#[must_use]
pub fn malformed_result(row: &InputRow, error: &QdsError) -> ResolutionResult {
    ResolutionResult {
        locality: row.locality.clone(),
        qds: row.qds.clone(),
        coordinate: None,
        source: ResolutionSource::MalformedInput,
        corrected_address: None,
        notes: error.to_string(),
    }
}

/// What to look up once the label has been cleaned.
struct Lookup {
    text: String,
    feature_type: FeatureType,
    farm_number: Option<u32>,
}

/// Resolves rows against shared reference datasets and an optional
/// geocoder.
pub struct LocationResolver {
    config: ResolverConfig,
    datasets: Arc<[ReferenceDataset]>,
    matcher: ReferenceMatcher,
    geocoder: Option<Arc<dyn Geocoder>>,
    geocoder_slots: Semaphore,
}

impl LocationResolver {
    /// Creates a resolver searching `datasets` in the given order.
    #[must_use]
    pub fn new(
        config: ResolverConfig,
        datasets: impl Into<Arc<[ReferenceDataset]>>,
        matcher: ReferenceMatcher,
    ) -> Self {
        let geocoder_slots = Semaphore::new(config.geocoder_max_concurrent.max(1));
        Self {
            config,
            datasets: datasets.into(),
            matcher,
            geocoder: None,
            geocoder_slots,
        }
    }

    /// Enables the geocoder fallback.
    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[must_use]
    pub fn datasets(&self) -> &[ReferenceDataset] {
        &self.datasets
    }

    /// Resolves a row, turning a malformed QDS into a
    /// [`ResolutionSource::MalformedInput`] result.
    pub async fn resolve(&self, row: &InputRow) -> ResolutionResult {
        match self.resolve_row(row).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Skipping '{}': {e}", row.locality);
                malformed_result(row, &e)
            }
        }
    }

    /// Resolves a row.
    ///
    /// # Errors
    ///
    /// Returns [`QdsError`] if the row's QDS code is malformed.
    pub async fn resolve_row(&self, row: &InputRow) -> Result<ResolutionResult, QdsError> {
        let qds = Qds::parse(&row.qds)?;
        let input_coordinate = row.coordinate.filter(Coordinate::is_valid);
        let (prior, prior_label) = match input_coordinate {
            Some(coordinate) => (coordinate, "input coordinate"),
            None => (qds.centroid(), "QDS centroid"),
        };
        let mut notes = Vec::new();

        let normalized = normalize(&row.locality);
        log::trace!("Normalized '{}' to '{}'", row.locality, normalized.text);

        let extraction = extract_direction(&normalized.text);
        let residual = extraction.residual.trim();
        let mut direction = extraction.direction;
        log::trace!(
            "Extracted {:?} offset {:?} from '{}', residual '{residual}'",
            extraction.form,
            direction,
            normalized.text
        );

        if residual.is_empty() {
            log::debug!("'{}' is empty after cleaning", row.locality);
            return Ok(match input_coordinate {
                Some(coordinate) => {
                    notes.push("Locality empty after cleaning, kept input coordinate".to_string());
                    finish(row, Some(coordinate), ResolutionSource::InputCoordinate, None, &notes)
                }
                None => {
                    notes.push("Locality empty after cleaning".to_string());
                    finish(row, None, ResolutionSource::Unresolved, None, &notes)
                }
            });
        }

        let farm = Some(detect_farm(residual))
            .filter(|farm| farm.is_farm)
            .or_else(|| implicit_farm_name(residual));

        if farm.is_some()
            && extraction.form == AnchorForm::Bracketed
            && let Some(discarded) = extraction.discarded
        {
            notes.push(format!("Kept offset {discarded} of farm-anchored label"));
            direction = Some(discarded);
        }

        let lookup = lookup_for(residual, farm.as_ref(), normalized.is_protected_area);
        log::debug!(
            "'{}' looks like a {} named '{}'",
            row.locality,
            lookup.feature_type,
            lookup.text
        );

        if let Some(coordinate) = parse_degree_literal(residual) {
            log::debug!("'{}' carries a degree literal", row.locality);
            notes.push("Coordinates written in locality".to_string());
            return Ok(finish(
                row,
                Some(coordinate),
                ResolutionSource::DegreeLiteral,
                None,
                &notes,
            ));
        }

        if lookup.text.is_empty() && lookup.farm_number.is_none() {
            notes.push("Nothing left to look up after farm cleanup".to_string());
            return Ok(finish(row, None, ResolutionSource::Unresolved, None, &notes));
        }

        let query = MatchQuery {
            text: &lookup.text,
            feature_type: lookup.feature_type,
            farm_number: lookup.farm_number,
            prior,
            qds: &qds,
        };

        for dataset in self.datasets.iter() {
            let report = self.matcher.find(&query, dataset);
            notes.push(report.note());

            if let Some(found) = report.matched {
                log::debug!(
                    "'{}' matched '{}' in {}",
                    row.locality,
                    found.record.name,
                    dataset.name
                );
                let coordinate = offset(found.record.coordinate, direction, &mut notes);
                return Ok(finish(
                    row,
                    Some(coordinate),
                    ResolutionSource::Dataset(dataset.name.clone()),
                    Some(found.record.name.clone()),
                    &notes,
                ));
            }
        }

        // A bare farm number means nothing to a geocoder.
        if lookup.text.is_empty() {
            notes.push("No farm name to geocode".to_string());
            return Ok(finish(row, None, ResolutionSource::Unresolved, None, &notes));
        }

        match self.geocode(&lookup.text, (prior, prior_label), &mut notes).await {
            Some(place) => {
                log::debug!(
                    "'{}' geocoded to '{}'",
                    row.locality,
                    place.formatted_address
                );
                let coordinate = offset(place.coordinate, direction, &mut notes);
                Ok(finish(
                    row,
                    Some(coordinate),
                    ResolutionSource::Geocoder,
                    Some(place.formatted_address),
                    &notes,
                ))
            }
            None => {
                log::debug!("'{}' is unresolved", row.locality);
                Ok(finish(row, None, ResolutionSource::Unresolved, None, &notes))
            }
        }
    }

    /// Queries the geocoder with `"<text>, <province>"` and applies the
    /// acceptance rules. Every failure counts as not found.
    ///
    /// `prior` is the point the accepted answer's distance is reported
    /// from, with a label naming where it came from.
    async fn geocode(
        &self,
        text: &str,
        prior: (Coordinate, &str),
        notes: &mut Vec<String>,
    ) -> Option<GeocodedPlace> {
        let Some(geocoder) = &self.geocoder else {
            notes.push("No geocoder configured".to_string());
            return None;
        };

        let query = format!("{text}, {}", self.config.province);
        let provider = geocoder.provider();

        let outcome = {
            let Ok(_slot) = self.geocoder_slots.acquire().await else {
                return None;
            };
            tokio::time::timeout(
                self.config.geocoder_timeout,
                geocoder.geocode(&query, &self.config.region),
            )
            .await
            .unwrap_or_else(|_| {
                Err(GeocodeError::Timeout {
                    seconds: self.config.geocoder_timeout.as_secs(),
                })
            })
        };

        match outcome {
            Ok(Some(place)) => {
                if let Some(reason) = self.rejection(&place) {
                    log::debug!("Rejected {provider} result for '{query}': {reason}");
                    notes.push(format!(
                        "Rejected {provider} result '{}': {reason}",
                        place.formatted_address
                    ));
                    return None;
                }

                let (prior, prior_label) = prior;
                notes.push(format!(
                    "Geocoded by {provider} with location type {}, {:.1} km from {prior_label}",
                    place.location_type.as_deref().unwrap_or("unknown"),
                    distance_km(prior, place.coordinate)
                ));
                Some(place)
            }
            Ok(None) => {
                notes.push(format!("No {provider} result for '{query}'"));
                None
            }
            Err(GeocodeError::RateLimited) => {
                log::warn!("{provider} rate limited while geocoding '{query}'");
                notes.push(format!("{provider} rate limited"));
                None
            }
            Err(e) => {
                log::warn!("{provider} failed for '{query}': {e}");
                notes.push(format!("{provider} failed: {e}"));
                None
            }
        }
    }

    /// Why a geocoder answer must not be used, if it must not.
    fn rejection(&self, place: &GeocodedPlace) -> Option<String> {
        let in_country = place
            .country_code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(&self.config.country_code));

        if !in_country {
            return Some(format!("outside {}", self.config.country_code));
        }

        if place.formatted_address.trim() == self.config.province_level_address() {
            return Some("province level only".to_string());
        }

        None
    }
}

fn lookup_for(residual: &str, farm: Option<&FarmDetection>, is_protected_area: bool) -> Lookup {
    match farm {
        Some(farm) => Lookup {
            text: farm.canonical_name.trim().to_string(),
            feature_type: FeatureType::Farm,
            farm_number: farm.farm_number,
        },
        None => Lookup {
            text: residual.to_string(),
            feature_type: if is_protected_area {
                FeatureType::Park
            } else {
                FeatureType::Unknown
            },
            farm_number: None,
        },
    }
}

fn offset(anchor: Coordinate, direction: Option<Direction>, notes: &mut Vec<String>) -> Coordinate {
    match direction {
        Some(direction) => {
            notes.push(format!("Applied offset {direction}"));
            apply_direction(anchor, &direction)
        }
        None => anchor,
    }
}

fn finish(
    row: &InputRow,
    coordinate: Option<Coordinate>,
    source: ResolutionSource,
    corrected_address: Option<String>,
    notes: &[String],
) -> ResolutionResult {
    ResolutionResult {
        locality: row.locality.clone(),
        qds: row.qds.clone(),
        coordinate,
        source,
        corrected_address,
        notes: notes.join("; "),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use georef_geocoder::{GeocodeError, GeocodedPlace, Geocoder, GeocodingProvider};
    use georef_locality_models::{Coordinate, FeatureType, LocalityRecord, ReferenceDataset};

    pub const SPRINGBOK: Coordinate = Coordinate::new(-29.664_3, 17.886_5);
    pub const RIETFONTEIN: Coordinate = Coordinate::new(-29.610_0, 17.950_0);
    pub const MUIZENBERG: Coordinate = Coordinate::new(-34.107_5, 18.470_3);

    pub fn record(name: &str, coordinate: Coordinate, qds: &str, priority: u32) -> LocalityRecord {
        LocalityRecord {
            id: name.to_lowercase(),
            name: name.to_string(),
            coordinate,
            qds: qds.to_string(),
            priority,
            feature_type: FeatureType::Unknown,
            source: "test".to_string(),
            farm_number: None,
            notes: String::new(),
        }
    }

    pub fn farms() -> ReferenceDataset {
        ReferenceDataset::new("Farms", FeatureType::Farm).with_records(vec![LocalityRecord {
            feature_type: FeatureType::Farm,
            ..record("Rietfontein", RIETFONTEIN, "2917BB", 1)
        }])
    }

    pub fn gazetteer() -> ReferenceDataset {
        ReferenceDataset::new("Gazetteer", FeatureType::Unknown).with_records(vec![
            record("Springbok", SPRINGBOK, "2917BB", 1),
            record("Muizenberg", MUIZENBERG, "3418AB", 1),
        ])
    }

    pub enum Reply {
        Found(GeocodedPlace),
        Nothing,
        Fail,
        Hang,
    }

    /// In-memory geocoder that records its queries.
    pub struct ScriptedGeocoder {
        reply: Reply,
        pub calls: AtomicUsize,
        pub queries: Mutex<Vec<String>>,
    }

    impl ScriptedGeocoder {
        pub fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn found(address: &str, country_code: &str, coordinate: Coordinate) -> Self {
            Self::new(Reply::Found(GeocodedPlace {
                coordinate,
                formatted_address: address.to_string(),
                country_code: Some(country_code.to_string()),
                location_type: Some("APPROXIMATE".to_string()),
                provider: GeocodingProvider::Google,
            }))
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Geocoder for ScriptedGeocoder {
        fn provider(&self) -> GeocodingProvider {
            GeocodingProvider::Google
        }

        async fn geocode(
            &self,
            query: &str,
            _region: &str,
        ) -> Result<Option<GeocodedPlace>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            match &self.reply {
                Reply::Found(place) => Ok(Some(place.clone())),
                Reply::Nothing => Ok(None),
                Reply::Fail => Err(GeocodeError::Status {
                    status: "UNKNOWN_ERROR".to_string(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use georef_locality_models::{Bearing, Direction, LocalityRecord};

    use super::test_support::*;
    use super::*;

    fn resolver(datasets: Vec<ReferenceDataset>) -> LocationResolver {
        LocationResolver::new(ResolverConfig::default(), datasets, ReferenceMatcher::default())
    }

    fn with_geocoder(geocoder: &Arc<ScriptedGeocoder>) -> LocationResolver {
        let geocoder = Arc::clone(geocoder) as Arc<dyn Geocoder>;
        resolver(vec![farms(), gazetteer()]).with_geocoder(geocoder)
    }

    fn assert_close(actual: Coordinate, expected: Coordinate) {
        assert!(
            (actual.latitude - expected.latitude).abs() < 1e-9
                && (actual.longitude - expected.longitude).abs() < 1e-9,
            "{actual:?} != {expected:?}"
        );
    }

    #[tokio::test]
    async fn farm_label_with_bracketed_offset_is_projected_from_farm() {
        let resolver = resolver(vec![farms(), gazetteer()]);
        let row = InputRow::new("On the farm Rietfontein 234, 10 km N of Springbok", "2917BB");

        let result = resolver.resolve(&row).await;

        let expected = apply_direction(
            RIETFONTEIN,
            &Direction {
                distance_km: 10.0,
                bearing: Bearing::N,
            },
        );
        assert_eq!(result.source, ResolutionSource::Dataset("Farms".to_string()));
        assert_close(result.coordinate.unwrap(), expected);
        assert_eq!(result.corrected_address.as_deref(), Some("Rietfontein"));
        assert!(result.notes.contains("Matched exactly in Farms"));
        assert!(result.notes.contains("Applied offset 10 km N"));
    }

    #[tokio::test]
    async fn farm_in_half_degree_cell_anchors_offset_for_quarter_degree_row() {
        let farm_at = Coordinate::new(-28.31, 17.82);
        let farms = ReferenceDataset::new("Farms", FeatureType::Farm).with_records(vec![
            LocalityRecord {
                feature_type: FeatureType::Farm,
                ..record("Rietfontein", farm_at, "2817B", 1)
            },
            LocalityRecord {
                feature_type: FeatureType::Farm,
                ..record("Rietfontein", Coordinate::new(-30.4, 18.6), "3018DA", 1)
            },
        ]);
        let resolver = resolver(vec![farms, gazetteer()]);
        let row = InputRow::new("On the farm Rietfontein 234, 10 km N of Springbok", "2817BA");

        let result = resolver.resolve(&row).await;

        let expected = apply_direction(
            farm_at,
            &Direction {
                distance_km: 10.0,
                bearing: Bearing::N,
            },
        );
        assert_eq!(result.source, ResolutionSource::Dataset("Farms".to_string()));
        assert_close(result.coordinate.unwrap(), expected);
        assert!(result.notes.contains("Kept offset 10 km N"));
    }

    #[tokio::test]
    async fn farm_number_without_name_is_looked_up_by_number() {
        let farms = ReferenceDataset::new("Farms", FeatureType::Farm).with_records(vec![
            LocalityRecord {
                feature_type: FeatureType::Farm,
                farm_number: Some(234),
                ..record("Rietfontein", RIETFONTEIN, "2917BB", 1)
            },
            LocalityRecord {
                feature_type: FeatureType::Farm,
                farm_number: Some(17),
                ..record("Kransvlei", Coordinate::new(-29.7, 17.8), "2917BB", 1)
            },
        ]);
        let geocoder = Arc::new(ScriptedGeocoder::new(Reply::Nothing));
        let resolver =
            resolver(vec![farms]).with_geocoder(Arc::clone(&geocoder) as Arc<dyn Geocoder>);

        let result = resolver.resolve(&InputRow::new("Farm 234", "2917BB")).await;

        assert_eq!(result.source, ResolutionSource::Dataset("Farms".to_string()));
        assert_eq!(result.coordinate, Some(RIETFONTEIN));
        assert!(result.notes.contains("Farm number 234 matched in Farms"));

        let result = resolver.resolve(&InputRow::new("Farm 999", "2917BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("No farm name to geocode"));
        assert_eq!(geocoder.call_count(), 0);
    }

    #[tokio::test]
    async fn bracketed_offset_without_farm_is_discarded() {
        let resolver = resolver(vec![gazetteer()]);
        let row = InputRow::new("Muizenberg, 20 km SE of Tokai", "3418AB");

        let result = resolver.resolve(&row).await;

        assert_eq!(result.coordinate, Some(MUIZENBERG));
        assert!(!result.notes.contains("Applied offset"));
    }

    #[tokio::test]
    async fn suffix_offset_is_applied_to_anchor() {
        let resolver = resolver(vec![gazetteer()]);
        let row = InputRow::new("40 km W of Springbok", "2917BB");

        let result = resolver.resolve(&row).await;

        let expected = apply_direction(
            SPRINGBOK,
            &Direction {
                distance_km: 40.0,
                bearing: Bearing::W,
            },
        );
        assert_eq!(result.source, ResolutionSource::Dataset("Gazetteer".to_string()));
        assert_close(result.coordinate.unwrap(), expected);
    }

    #[tokio::test]
    async fn degree_literal_skips_datasets_and_geocoder() {
        let geocoder = Arc::new(ScriptedGeocoder::new(Reply::Nothing));
        let resolver = with_geocoder(&geocoder);
        let row = InputRow::new("31d38m43sS 20d24m57sE", "3120AD");

        let result = resolver.resolve(&row).await;

        assert_eq!(result.source, ResolutionSource::DegreeLiteral);
        let coordinate = result.coordinate.unwrap();
        assert!((coordinate.latitude - -31.645_3).abs() < 1e-3);
        assert!((coordinate.longitude - 20.415_8).abs() < 1e-3);
        assert_eq!(geocoder.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_locality_keeps_input_coordinate() {
        let resolver = resolver(vec![gazetteer()]);
        let input = Coordinate::new(-29.5, 17.5);
        let row = InputRow::new("  ;  ", "2917BB").with_coordinate(input);

        let result = resolver.resolve(&row).await;

        assert_eq!(result.source, ResolutionSource::InputCoordinate);
        assert_eq!(result.coordinate, Some(input));
    }

    #[tokio::test]
    async fn empty_locality_without_coordinate_is_unresolved() {
        let resolver = resolver(vec![gazetteer()]);
        let row = InputRow::new("", "2917BB");

        let result = resolver.resolve(&row).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.coordinate.is_none());
    }

    #[tokio::test]
    async fn malformed_qds_is_reported_not_resolved() {
        let resolver = resolver(vec![gazetteer()]);
        let row = InputRow::new("Springbok", "29X7");

        assert!(resolver.resolve_row(&row).await.is_err());

        let result = resolver.resolve(&row).await;
        assert_eq!(result.source, ResolutionSource::MalformedInput);
        assert!(result.coordinate.is_none());
        assert!(!result.notes.is_empty());
    }

    #[tokio::test]
    async fn first_dataset_with_a_match_wins() {
        let shadow = ReferenceDataset::new("Towns", FeatureType::Town).with_records(vec![record(
            "Springbok",
            Coordinate::new(-29.7, 17.9),
            "2917BB",
            1,
        )]);
        let resolver = resolver(vec![shadow, gazetteer()]);

        let result = resolver.resolve(&InputRow::new("Springbok", "2917BB")).await;

        assert_eq!(result.source, ResolutionSource::Dataset("Towns".to_string()));
        assert_eq!(result.coordinate, Some(Coordinate::new(-29.7, 17.9)));
    }

    #[tokio::test]
    async fn geocoder_answer_inside_country_is_accepted() {
        let place = Coordinate::new(-30.2, 18.0);
        let geocoder = Arc::new(ScriptedGeocoder::found(
            "Kamieskroon, 8241, South Africa",
            "ZA",
            place,
        ));
        let resolver = with_geocoder(&geocoder);

        let result = resolver.resolve(&InputRow::new("Kamieskroon", "3017BB")).await;

        assert_eq!(result.source, ResolutionSource::Geocoder);
        assert_eq!(result.coordinate, Some(place));
        assert_eq!(
            result.corrected_address.as_deref(),
            Some("Kamieskroon, 8241, South Africa")
        );
        assert!(result.notes.contains("location type APPROXIMATE"));
        assert!(result.notes.contains("km from QDS centroid"));
        assert_eq!(
            geocoder.queries.lock().unwrap().as_slice(),
            ["Kamieskroon, Northern Cape"]
        );
    }

    #[tokio::test]
    async fn geocoder_note_measures_from_input_coordinate_when_given() {
        let place = Coordinate::new(-30.2, 18.0);
        let geocoder = Arc::new(ScriptedGeocoder::found(
            "Kamieskroon, 8241, South Africa",
            "ZA",
            place,
        ));
        let resolver = with_geocoder(&geocoder);
        let row = InputRow::new("Kamieskroon", "3017BB").with_coordinate(place);

        let result = resolver.resolve(&row).await;

        assert_eq!(result.source, ResolutionSource::Geocoder);
        assert!(result.notes.contains("0.0 km from input coordinate"));
        assert!(!result.notes.contains("QDS centroid"));
    }

    #[tokio::test]
    async fn province_level_geocoder_answer_is_rejected() {
        let geocoder = Arc::new(ScriptedGeocoder::found(
            "Northern Cape, South Africa",
            "ZA",
            Coordinate::new(-29.0, 21.8),
        ));
        let resolver = with_geocoder(&geocoder);

        let result = resolver.resolve(&InputRow::new("Kamieskroon", "3017BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("province level only"));
    }

    #[tokio::test]
    async fn foreign_geocoder_answer_is_rejected() {
        let geocoder = Arc::new(ScriptedGeocoder::found(
            "Kamieskroon, Namibia",
            "NA",
            Coordinate::new(-22.0, 17.0),
        ));
        let resolver = with_geocoder(&geocoder);

        let result = resolver.resolve(&InputRow::new("Kamieskroon", "3017BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("outside ZA"));
    }

    #[tokio::test]
    async fn geocoder_failure_counts_as_not_found() {
        let geocoder = Arc::new(ScriptedGeocoder::new(Reply::Fail));
        let resolver = with_geocoder(&geocoder);

        let result = resolver.resolve(&InputRow::new("Kamieskroon", "3017BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("UNKNOWN_ERROR"));
    }

    #[tokio::test(start_paused = true)]
    async fn geocoder_timeout_counts_as_not_found() {
        let geocoder = Arc::new(ScriptedGeocoder::new(Reply::Hang));
        let resolver = with_geocoder(&geocoder);

        let result = resolver.resolve(&InputRow::new("Kamieskroon", "3017BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("timed out after 10s"));
    }

    #[tokio::test]
    async fn without_geocoder_unmatched_rows_are_unresolved() {
        let resolver = resolver(vec![gazetteer()]);

        let result = resolver.resolve(&InputRow::new("Kamieskroon", "3017BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("No match in Gazetteer"));
        assert!(result.notes.contains("No geocoder configured"));
    }

    #[tokio::test]
    async fn common_farm_name_is_not_fuzzy_matched() {
        let resolver = resolver(vec![farms()]);

        let result = resolver.resolve(&InputRow::new("Farm Fountain", "2917BB")).await;

        assert_eq!(result.source, ResolutionSource::Unresolved);
        assert!(result.notes.contains("too common"));
    }
}
