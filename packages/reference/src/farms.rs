//! Farm registry CSV parser.
//!
//! Registry exports list one registered farm per row with its grid cell,
//! centroid and province. Names often carry the farm number
//! (`"RIETFONTEIN 234"`); an explicit `farm_number` column wins when
//! present.

use std::io::Read;
use std::path::Path;

use georef_locality_models::{Coordinate, FeatureType, LocalityRecord};
use serde::Deserialize;

use crate::{ReferenceError, open_csv, tables::ProvinceAliases};

/// A raw farm registry row.
#[derive(Debug, Deserialize)]
pub struct FarmRow {
    /// Registry identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Farm name, possibly with its number.
    #[serde(alias = "farm", alias = "farm_name")]
    pub name: String,
    /// QDS code of the farm.
    #[serde(default, alias = "locus")]
    pub qds: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon", alias = "long")]
    pub longitude: f64,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub farm_number: Option<u32>,
}

/// How registry rows become records.
#[derive(Debug, Clone)]
pub struct FarmRegistryOptions<'a> {
    /// Dataset label, used in record ids and logs.
    pub dataset: &'a str,
    /// Keep only rows of this province (alias-aware). Rows without a
    /// province are kept.
    pub province: Option<&'a str>,
    pub aliases: &'a ProvinceAliases,
    /// Trust tier shared by every record.
    pub priority: u32,
}

impl FarmRow {
    /// Converts this row into a record.
    ///
    /// Returns `None` for a blank name, an invalid coordinate, or a
    /// province other than the requested one.
    #[must_use]
    pub fn to_record(
        &self,
        index: usize,
        options: &FarmRegistryOptions<'_>,
    ) -> Option<LocalityRecord> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }

        let coordinate = Coordinate::new(self.latitude, self.longitude);
        if !coordinate.is_valid() {
            return None;
        }

        if let (Some(wanted), Some(province)) = (options.province, self.province.as_deref())
            && !province.trim().is_empty()
            && !options.aliases.same_province(wanted, province)
        {
            return None;
        }

        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| format!("{}:{}", options.dataset, index + 1), ToString::to_string);

        Some(LocalityRecord {
            id,
            name: name.to_string(),
            coordinate,
            qds: self.qds.trim().to_string(),
            priority: options.priority,
            feature_type: FeatureType::Farm,
            source: options.dataset.to_string(),
            farm_number: self.farm_number.or_else(|| trailing_number(name)),
            notes: self
                .province
                .as_deref()
                .map(|province| options.aliases.canonical(province).to_string())
                .unwrap_or_default(),
        })
    }
}

/// Parses registry rows from any `Read` source. Malformed rows are skipped.
///
/// # Errors
///
/// Returns [`ReferenceError::Csv`] if the header row cannot be read.
pub fn read_farm_registry(
    reader: impl Read,
    options: &FarmRegistryOptions<'_>,
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
    let mut skipped = 0u64;
    for (index, result) in csv_reader.deserialize::<FarmRow>().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed farm row: {e}");
                skipped += 1;
                continue;
            }
        };

        match row.to_record(index, options) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    log::info!(
        "Loaded {} farms into {} ({skipped} rows skipped)",
        records.len(),
        options.dataset
    );

    Ok(records)
}

/// Parses a farm registry CSV file.
///
/// # Errors
///
/// Returns an error if the file is missing or its header is unreadable.
pub fn load_farm_registry(
    path: &Path,
    options: &FarmRegistryOptions<'_>,
) -> Result<Vec<LocalityRecord>, ReferenceError> {
    let file = open_csv(path)?;
    read_farm_registry(file, options)
}

/// The last whitespace-separated token, when it is a 2-4 digit number.
fn trailing_number(name: &str) -> Option<u32> {
    let last = name.split_whitespace().next_back()?;
    let digits = last.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']'));
    if (2..=4).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}
