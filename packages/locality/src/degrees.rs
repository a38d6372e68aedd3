//! Inline degree/minute/second coordinates.
//!
//! Some labels already carry the point, either hemisphere-first
//! (`"S 31 38 43 E 20 24 57"`, `"S31.38.43 E20.24.57"`) or hemisphere-last
//! (`"31d38m43sS 20d24m57sE"`, `"31°38'43\"S 20°24'57\"E"`). Only southern
//! latitudes and eastern longitudes occur in the corpus.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use georef_locality_models::Coordinate;

/// `S dd mm ss E ddd mm ss`.
static HEMISPHERE_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        \bS\s*\.?\s*
        (?P<lat_deg>\d{1,2})[\s.d°]+(?P<lat_min>\d{1,2})[\s.m'′]+(?P<lat_sec>\d{1,2}(?:\.\d+)?)
        [\s.s"″]*[,;]?\s*
        E\s*\.?\s*
        (?P<lng_deg>\d{1,3})[\s.d°]+(?P<lng_min>\d{1,2})[\s.m'′]+(?P<lng_sec>\d{1,2}(?:\.\d+)?)"#,
    )
    .expect("valid regex")
});

/// `dd mm ss S ddd mm ss E`.
static HEMISPHERE_LAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?ix)
        \b(?P<lat_deg>\d{1,2})[\s.d°]+(?P<lat_min>\d{1,2})[\s.m'′]+(?P<lat_sec>\d{1,2}(?:\.\d+)?)
        [\s.s"″]*S[\s,;]*
        (?P<lng_deg>\d{1,3})[\s.d°]+(?P<lng_min>\d{1,2})[\s.m'′]+(?P<lng_sec>\d{1,2}(?:\.\d+)?)
        [\s.s"″]*E\b"#,
    )
    .expect("valid regex")
});

/// Finds a degree/minute/second literal and converts it to signed decimal
/// degrees (`degrees + minutes / 60 + seconds / 3600`, latitude negated).
///
/// Returns `None` if no literal is present or a component is out of range
/// (minutes or seconds of 60 or more, latitude beyond 90, longitude beyond
/// 180).
#[must_use]
pub fn parse_degree_literal(text: &str) -> Option<Coordinate> {
    let caps = HEMISPHERE_FIRST_RE
        .captures(text)
        .or_else(|| HEMISPHERE_LAST_RE.captures(text))?;

    let latitude = component(&caps, "lat")?;
    let longitude = component(&caps, "lng")?;

    if latitude > 90.0 || longitude > 180.0 {
        return None;
    }

    let coordinate = Coordinate::new(-latitude, longitude);
    log::trace!(
        "Degree literal in '{text}': ({:.5}, {:.5})",
        coordinate.latitude,
        coordinate.longitude
    );

    Some(coordinate)
}

fn component(caps: &Captures<'_>, prefix: &str) -> Option<f64> {
    let field = |name: &str| -> Option<f64> {
        caps.name(&format!("{prefix}_{name}"))?
            .as_str()
            .parse()
            .ok()
    };

    let degrees = field("deg")?;
    let minutes = field("min")?;
    let seconds = field("sec")?;

    if minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }

    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}
