#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for specimen locality georeferencing.
//!
//! This crate contains only data types and simple conversions: coordinates,
//! quarter-degree-square (QDS) grid codes, compass directions, reference
//! records and resolution results. It has no heavyweight dependencies (no
//! regex, no I/O).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Prefix for the map link written next to every resolved coordinate.
pub const GOOGLE_MAPS_PLACE_PREFIX: &str = "http://www.google.co.za/maps/place/";

/// A point in signed decimal degrees (WGS84). Southern latitudes are
/// negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside the valid WGS84 range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Google Maps place link for this coordinate.
    #[must_use]
    pub fn google_maps_link(&self) -> String {
        format!(
            "{GOOGLE_MAPS_PLACE_PREFIX}{:.6},{:.6}",
            self.latitude, self.longitude
        )
    }
}

/// Errors raised when a QDS code cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QdsError {
    /// Fewer than the five characters that identify a cell.
    #[error("QDS '{code}' is too short: expected at least 5 characters")]
    TooShort {
        /// The offending code.
        code: String,
    },

    /// The first four characters must be digits.
    #[error("QDS '{code}' must start with four digits")]
    NonNumeric {
        /// The offending code.
        code: String,
    },

    /// The fifth character must be one of `A`-`D`.
    #[error("QDS '{code}' has invalid quadrant '{quadrant}': expected A-D")]
    InvalidQuadrant {
        /// The offending code.
        code: String,
        /// The character found in the quadrant position.
        quadrant: char,
    },
}

/// A validated quarter-degree-square grid reference, e.g. `2817BA`.
///
/// Two digits of (southern) latitude, two digits of longitude, a quadrant
/// letter `A`-`D` and optional further subdivision. Only the first five
/// characters take part in cell comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Qds(String);

/// Corners of a QDS cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QdsBounds {
    /// South-west corner.
    pub south_west: Coordinate,
    /// North-east corner.
    pub north_east: Coordinate,
}

impl QdsBounds {
    /// Midpoint of the cell.
    #[must_use]
    pub fn centroid(&self) -> Coordinate {
        Coordinate::new(
            f64::midpoint(self.south_west.latitude, self.north_east.latitude),
            f64::midpoint(self.south_west.longitude, self.north_east.longitude),
        )
    }

    /// Whether `point` lies inside the cell (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
    }
}

impl Qds {
    /// Number of leading characters that identify a cell.
    pub const CELL_LEN: usize = 5;

    /// Parses and validates a QDS code. Surrounding whitespace is ignored
    /// and letters are upper-cased.
    ///
    /// # Errors
    ///
    /// Returns [`QdsError`] if the code is shorter than five characters,
    /// does not start with four digits, or has a quadrant outside `A`-`D`.
    pub fn parse(raw: &str) -> Result<Self, QdsError> {
        let code = raw.trim().to_ascii_uppercase();
        let chars: Vec<char> = code.chars().collect();

        if chars.len() < Self::CELL_LEN {
            return Err(QdsError::TooShort { code });
        }
        if !chars[..4].iter().all(char::is_ascii_digit) {
            return Err(QdsError::NonNumeric { code });
        }
        let quadrant = chars[4];
        if !matches!(quadrant, 'A'..='D') {
            return Err(QdsError::InvalidQuadrant { code, quadrant });
        }

        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The five-character cell prefix (e.g. `2817B`).
    #[must_use]
    pub fn cell(&self) -> &str {
        &self.0[..Self::CELL_LEN]
    }

    /// Whether `other` (a possibly unvalidated code from a reference
    /// dataset) lies in the same cell.
    #[must_use]
    pub fn same_cell(&self, other: &str) -> bool {
        qds_cell(other).is_some_and(|cell| cell.eq_ignore_ascii_case(self.cell()))
    }

    /// Bounding box of the cell, southern hemisphere.
    ///
    /// The fifth character picks the half-degree quadrant of the one-degree
    /// square. A sixth character `A`-`D` refines it to the quarter-degree
    /// square; anything after that is ignored.
    #[must_use]
    pub fn bounds(&self) -> QdsBounds {
        let bytes = self.0.as_bytes();
        let degrees_south = f64::from((bytes[0] - b'0') * 10 + (bytes[1] - b'0'));
        let degrees_east = f64::from((bytes[2] - b'0') * 10 + (bytes[3] - b'0'));

        // Offsets measured southwards from the top edge and eastwards from
        // the left edge of the one-degree square.
        let (mut south, mut east) = quadrant_offset(bytes[4], 0.5);
        let mut size = 0.5;

        if let Some(&sub) = bytes.get(5)
            && matches!(sub, b'A'..=b'D')
        {
            let (sub_south, sub_east) = quadrant_offset(sub, 0.25);
            south += sub_south;
            east += sub_east;
            size = 0.25;
        }

        let north_lat = -(degrees_south + south);
        let west_lng = degrees_east + east;

        QdsBounds {
            south_west: Coordinate::new(north_lat - size, west_lng),
            north_east: Coordinate::new(north_lat, west_lng + size),
        }
    }

    /// Centre of [`Self::bounds`].
    #[must_use]
    pub fn centroid(&self) -> Coordinate {
        self.bounds().centroid()
    }
}

/// `A` is the north-west quadrant, `B` north-east, `C` south-west, `D`
/// south-east.
const fn quadrant_offset(quadrant: u8, size: f64) -> (f64, f64) {
    match quadrant {
        b'B' => (0.0, size),
        b'C' => (size, 0.0),
        b'D' => (size, size),
        _ => (0.0, 0.0),
    }
}

impl TryFrom<String> for Qds {
    type Error = QdsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Qds> for String {
    fn from(value: Qds) -> Self {
        value.0
    }
}

impl std::fmt::Display for Qds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The five-character cell prefix of an unvalidated code, if it has one.
#[must_use]
pub fn qds_cell(code: &str) -> Option<&str> {
    let code = code.trim();
    code.get(..Qds::CELL_LEN)
}

/// One of the four axes a displacement is applied along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Cardinal {
    North,
    East,
    South,
    West,
}

impl Cardinal {
    /// Compass bearing in degrees clockwise from north.
    #[must_use]
    pub const fn degrees(self) -> f64 {
        match self {
            Self::North => 0.0,
            Self::East => 90.0,
            Self::South => 180.0,
            Self::West => 270.0,
        }
    }
}

/// An eight-point compass bearing as written on specimen labels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
#[allow(clippy::upper_case_acronyms)]
pub enum Bearing {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Bearing {
    /// Parses a bearing token as it appears on a label: abbreviations
    /// (`SE`), words (`south-east`, `southeast`, `south east`) and the
    /// clipped spellings `nth`, `nrth`, `sth`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let squashed: String = token
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();

        let expanded = squashed
            .replace("north", "n")
            .replace("nrth", "n")
            .replace("nth", "n")
            .replace("south", "s")
            .replace("sth", "s")
            .replace("east", "e")
            .replace("west", "w");

        match expanded.as_str() {
            "n" => Some(Self::N),
            "ne" => Some(Self::NE),
            "e" => Some(Self::E),
            "se" => Some(Self::SE),
            "s" => Some(Self::S),
            "sw" => Some(Self::SW),
            "w" => Some(Self::W),
            "nw" => Some(Self::NW),
            _ => None,
        }
    }

    /// The single-axis components, in the order they are applied.
    ///
    /// Intercardinal bearings decompose into their north/south component
    /// followed by their east/west component.
    #[must_use]
    pub const fn components(self) -> &'static [Cardinal] {
        match self {
            Self::N => &[Cardinal::North],
            Self::E => &[Cardinal::East],
            Self::S => &[Cardinal::South],
            Self::W => &[Cardinal::West],
            Self::NE => &[Cardinal::North, Cardinal::East],
            Self::SE => &[Cardinal::South, Cardinal::East],
            Self::SW => &[Cardinal::South, Cardinal::West],
            Self::NW => &[Cardinal::North, Cardinal::West],
        }
    }

    /// True diagonal bearing in degrees, for reporting.
    #[must_use]
    pub const fn degrees(self) -> f64 {
        match self {
            Self::N => 0.0,
            Self::NE => 45.0,
            Self::E => 90.0,
            Self::SE => 135.0,
            Self::S => 180.0,
            Self::SW => 225.0,
            Self::W => 270.0,
            Self::NW => 315.0,
        }
    }

    #[must_use]
    pub const fn is_intercardinal(self) -> bool {
        self.components().len() == 2
    }
}

/// A displacement extracted from a label, e.g. "20 km SE of".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    /// Distance in kilometres.
    pub distance_km: f64,
    /// Compass bearing from the anchor place.
    pub bearing: Bearing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} km {}", self.distance_km, self.bearing)
    }
}

/// Coarse category of a geographic entity.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeatureType {
    Town,
    Mountain,
    Railway,
    Farm,
    Park,
    #[default]
    Unknown,
}

impl FeatureType {
    /// Whether a candidate of this type may satisfy a query expecting
    /// `expected`. Records of unknown type are compatible with anything.
    #[must_use]
    pub fn is_compatible_with(self, expected: Self) -> bool {
        self == expected || self == Self::Unknown
    }
}

/// A reference-database entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityRecord {
    /// Identifier unique within its dataset.
    pub id: String,
    /// Place name as recorded by the source.
    pub name: String,
    /// Location of the place.
    pub coordinate: Coordinate,
    /// QDS code recorded by the source (not validated).
    pub qds: String,
    /// Trust tier; lower is more trustworthy.
    pub priority: u32,
    /// Coarse category.
    pub feature_type: FeatureType,
    /// Source code or dataset label the record came from.
    pub source: String,
    /// Registered farm number, for farm registries.
    pub farm_number: Option<u32>,
    /// Free-text remarks.
    #[serde(default)]
    pub notes: String,
}

/// A named, ordered collection of reference records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataset {
    /// Display name, recorded as the resolution source on a match.
    pub name: String,
    /// Default category of the dataset's records.
    pub feature_type: FeatureType,
    /// Records in source order.
    pub records: Vec<LocalityRecord>,
}

impl ReferenceDataset {
    #[must_use]
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            feature_type,
            records: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_records(mut self, records: Vec<LocalityRecord>) -> Self {
        self.records = records;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The coordinate supplied with the input row was kept.
    InputCoordinate,
    /// An inline degree/minute/second literal in the locality text.
    DegreeLiteral,
    /// A reference dataset, by name.
    Dataset(String),
    /// The external geocoder.
    Geocoder,
    /// Nothing resolved the locality.
    Unresolved,
    /// The row could not be read (bad QDS).
    MalformedInput,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputCoordinate => f.write_str("input coordinate"),
            Self::DegreeLiteral => f.write_str("degree literal"),
            Self::Dataset(name) => f.write_str(name),
            Self::Geocoder => f.write_str("external geocoder"),
            Self::Unresolved => f.write_str("unresolved"),
            Self::MalformedInput => f.write_str("malformed input"),
        }
    }
}

/// Terminal outcome for one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// The locality text exactly as supplied.
    pub locality: String,
    /// The QDS code exactly as supplied.
    pub qds: String,
    /// Resolved point, if any.
    pub coordinate: Option<Coordinate>,
    /// Provenance of [`Self::coordinate`].
    pub source: ResolutionSource,
    /// Matched record name or geocoder formatted address.
    pub corrected_address: Option<String>,
    /// Confidence and provenance remarks, `"; "`-separated.
    pub notes: String,
}

impl ResolutionResult {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.coordinate.is_some()
    }

    /// Map link for the resolved coordinate, or `None` when unresolved.
    #[must_use]
    pub fn google_maps_link(&self) -> Option<String> {
        self.coordinate.as_ref().map(Coordinate::google_maps_link)
    }
}
