//! Gazetteer CSV parser.
//!
//! A gazetteer mixes place names compiled from several sources of varying
//! quality, so each record takes its priority from its source code.

use std::io::Read;
use std::path::Path;

use georef_locality_models::{Coordinate, FeatureType, LocalityRecord};
use serde::Deserialize;

use crate::{ReferenceError, open_csv, tables::SourcePriorities};

/// A raw gazetteer row.
#[derive(Debug, Deserialize)]
pub struct GazetteerRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "place", alias = "place_name")]
    pub name: String,
    #[serde(default, alias = "locus")]
    pub qds: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon", alias = "long")]
    pub longitude: f64,
    /// Source code, looked up in the priority table.
    #[serde(default, alias = "source_code", alias = "code")]
    pub source: String,
    /// Per-row category (`town`, `mountain`, ...). Falls back to the
    /// dataset's type when absent or unrecognized.
    #[serde(default, alias = "type", alias = "feature")]
    pub feature_type: Option<String>,
}

/// How gazetteer rows become records.
#[derive(Debug, Clone)]
pub struct GazetteerOptions<'a> {
    pub dataset: &'a str,
    pub feature_type: FeatureType,
    pub priorities: &'a SourcePriorities,
}

impl GazetteerRow {
    /// Converts this row into a record, or `None` for a blank name or an
    /// invalid coordinate.
    #[must_use]
    pub fn to_record(
        &self,
        index: usize,
        options: &GazetteerOptions<'_>,
    ) -> Option<LocalityRecord> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }

        let coordinate = Coordinate::new(self.latitude, self.longitude);
        if !coordinate.is_valid() {
            return None;
        }

        let feature_type = self
            .feature_type
            .as_deref()
            .and_then(|value| value.trim().parse::<FeatureType>().ok())
            .unwrap_or(options.feature_type);

        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| format!("{}:{}", options.dataset, index + 1), ToString::to_string);

        let source = self.source.trim();

        Some(LocalityRecord {
            id,
            name: name.to_string(),
            coordinate,
            qds: self.qds.trim().to_string(),
            priority: options.priorities.priority_of(source),
            feature_type,
            source: source.to_string(),
            farm_number: None,
            notes: String::new(),
        })
    }
}

/// Parses gazetteer rows from any `Read` source. Malformed rows are
/// skipped.
///
/// # Errors
///
/// Returns [`ReferenceError::Csv`] if the header row cannot be read.
pub fn read_gazetteer(
    reader: impl Read,
    options: &GazetteerOptions<'_>,
) -> Result<Vec<LocalityRecord>, ReferenceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.headers().map_err(|e| ReferenceError::Csv {
        path: options.dataset.to_string(),
        source: e,
    })?;

    let mut records = Vec::new();
    for (index, result) in csv_reader.deserialize::<GazetteerRow>().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed gazetteer row: {e}");
                continue;
            }
        };

        if let Some(record) = row.to_record(index, options) {
            records.push(record);
        }
    }

    log::info!("Loaded {} places into {}", records.len(), options.dataset);

    Ok(records)
}

/// Parses a gazetteer CSV file.
///
/// # Errors
///
/// Returns an error if the file is missing or its header is unreadable.
pub fn load_gazetteer(
    path: &Path,
    options: &GazetteerOptions<'_>,
) -> Result<Vec<LocalityRecord>, ReferenceError> {
    let file = open_csv(path)?;
    read_gazetteer(file, options)
}
