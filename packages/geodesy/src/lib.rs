#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Distance and projection helpers for georeferencing.
//!
//! [`distance_km`] is a cheap planar approximation used only to rank
//! candidates by proximity to a prior point. [`project`] solves the direct
//! geodesic problem on the WGS84 ellipsoid (via `geo`'s Karney
//! implementation) and is used to apply "20 km SE of X" offsets.

use geo::{Destination, Geodesic, Point};
use georef_locality_models::{Coordinate, Direction};

/// Kilometres per degree of latitude.
pub const KM_PER_DEGREE_LATITUDE: f64 = 110.54;

/// Kilometres per degree of longitude at the equator.
pub const KM_PER_DEGREE_LONGITUDE: f64 = 111.32;

/// Approximate distance in kilometres between two points.
///
/// Equirectangular approximation whose longitude term is scaled by the
/// cosine of the *longitude delta*, not of the latitude. Candidate
/// disambiguation thresholds assume this formula.
///
/// Known limitation: absolute values are inaccurate away from the
/// equator. Only compare distances measured from the same point; do not
/// report them as real distances.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let delta_lat = a.latitude - b.latitude;
    let delta_lng = a.longitude - b.longitude;

    let y = delta_lat * KM_PER_DEGREE_LATITUDE;
    let x = delta_lng * KM_PER_DEGREE_LONGITUDE * delta_lng.to_radians().cos();

    x.hypot(y)
}

/// Projects `origin` along `bearing_degrees` (clockwise from north) for
/// `distance_km` kilometres on the WGS84 ellipsoid.
#[must_use]
pub fn project(origin: Coordinate, bearing_degrees: f64, distance_km: f64) -> Coordinate {
    let start = Point::new(origin.longitude, origin.latitude);
    let end = Geodesic.destination(start, bearing_degrees, distance_km * 1000.0);
    Coordinate::new(end.y(), end.x())
}

/// Applies an extracted label offset to an anchor point.
///
/// Intercardinal bearings are applied as two sequential single-axis
/// projections (e.g. south, then east), each using the full stated
/// distance. This reproduces how the source data was curated and lands
/// further away than a true diagonal would (by a factor of about
/// `sqrt(2)`).
#[must_use]
pub fn apply_direction(origin: Coordinate, direction: &Direction) -> Coordinate {
    let projected = direction
        .bearing
        .components()
        .iter()
        .fold(origin, |point, cardinal| {
            project(point, cardinal.degrees(), direction.distance_km)
        });

    log::trace!(
        "Projected ({:.5}, {:.5}) by {direction} to ({:.5}, {:.5})",
        origin.latitude,
        origin.longitude,
        projected.latitude,
        projected.longitude
    );

    projected
}
