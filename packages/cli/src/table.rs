//! Reading specimen rows and writing resolved rows as CSV.

use std::io::{Read, Write};
use std::path::Path;

use georef_locality_models::{Coordinate, ResolutionResult};
use georef_resolver::InputRow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading or writing a CSV table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One specimen row. Only `Locality` and `Locus` are required; other
/// columns are ignored.
#[derive(Debug, Deserialize)]
struct SpecimenRow {
    #[serde(rename = "Locality", alias = "locality", default)]
    locality: String,
    #[serde(rename = "Locus", alias = "locus", alias = "QDS", alias = "qds", default)]
    locus: String,
    #[serde(
        rename = "Latitude",
        alias = "latitude",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    latitude: Option<f64>,
    #[serde(
        rename = "Longitude",
        alias = "longitude",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    longitude: Option<f64>,
}

impl From<SpecimenRow> for InputRow {
    fn from(row: SpecimenRow) -> Self {
        let coordinate = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        };
        Self {
            locality: row.locality,
            qds: row.locus,
            coordinate,
        }
    }
}

/// One output row.
#[derive(Debug, Serialize)]
struct ResolvedRow<'a> {
    original_locality: &'a str,
    original_qds: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    source: String,
    precision_by: &'a str,
    corrected_address: &'a str,
    google_maps_link: String,
    notes: &'a str,
}

impl<'a> ResolvedRow<'a> {
    fn new(result: &'a ResolutionResult, precision_by: &'a str) -> Self {
        Self {
            original_locality: &result.locality,
            original_qds: &result.qds,
            latitude: result.coordinate.map(|c| c.latitude),
            longitude: result.coordinate.map(|c| c.longitude),
            source: result.source.to_string(),
            precision_by,
            corrected_address: result.corrected_address.as_deref().unwrap_or_default(),
            google_maps_link: result.google_maps_link().unwrap_or_default(),
            notes: &result.notes,
        }
    }
}

/// Reads specimen rows from a CSV file.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be opened or is not valid
/// CSV.
pub fn read_input(path: &Path) -> Result<Vec<InputRow>, TableError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| TableError::Io {
        path: label.clone(),
        source: e,
    })?;
    let rows = parse_input(file, &label)?;
    log::info!("Read {} rows from {label}", rows.len());
    Ok(rows)
}

/// Parses specimen rows from any reader; `label` names it in errors.
///
/// Every record becomes a row, so the output has one row per input row.
///
/// # Errors
///
/// Returns [`TableError::Csv`] on malformed CSV.
pub fn parse_input<R: Read>(reader: R, label: &str) -> Result<Vec<InputRow>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    csv_reader
        .deserialize::<SpecimenRow>()
        .map(|row| {
            row.map(InputRow::from).map_err(|e| TableError::Csv {
                path: label.to_string(),
                source: e,
            })
        })
        .collect()
}

/// Writes resolved rows to a CSV file.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be created or written.
pub fn write_output(
    path: &Path,
    results: &[ResolutionResult],
    precision_by: &str,
) -> Result<(), TableError> {
    let label = path.display().to_string();
    let file = std::fs::File::create(path).map_err(|e| TableError::Io {
        path: label.clone(),
        source: e,
    })?;
    write_results(file, results, precision_by, &label)?;
    log::info!("Wrote {} rows to {label}", results.len());
    Ok(())
}

/// Writes resolved rows, header first, in the given order.
///
/// # Errors
///
/// Returns [`TableError`] if a row cannot be serialized or written.
pub fn write_results<W: Write>(
    writer: W,
    results: &[ResolutionResult],
    precision_by: &str,
    label: &str,
) -> Result<(), TableError> {
    let csv_error = |e: csv::Error| TableError::Csv {
        path: label.to_string(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    for result in results {
        csv_writer
            .serialize(ResolvedRow::new(result, precision_by))
            .map_err(csv_error)?;
    }
    csv_writer.flush().map_err(|e| TableError::Io {
        path: label.to_string(),
        source: e,
    })
}
