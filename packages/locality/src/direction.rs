//! Directional offset extraction.
//!
//! Labels often locate a specimen relative to a better-known place:
//! - Suffix anchor: `"40 km W from Muizenberg"`
//! - Prefix anchor: `"Muizenberg 40km W"`
//! - Bracketed: `"Muizenberg, 20 km SE of Tokai"`
//!
//! In the bracketed form the offset relates two *other* places, so it is
//! dropped and only the leading text is kept.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use georef_locality_models::{Bearing, Direction};

/// `<distance> <unit> <bearing> [of|from]`. Intercardinals may be dotted
/// or spaced (`N.E.`, `S. W.`, `N E`); they are tried before single letters.
static DIRECTION_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b(?P<distance>\d+(?:[.,]\d+)?)\s*
        (?P<unit>kilometres|kilometers|kms|km|metres|meters|miles|mile|mi|m)\.?\s+
        (?P<bearing>
            [ns]\.?\s?[ew]\b\.?
            |(?:
                north[\s-]?east|north[\s-]?west|south[\s-]?east|south[\s-]?west
                |north|south|east|west|nrth|nth|sth
                |n|s|e|w
            )\b\.?
        )
        (?:\s*\b(?:of|fro?m)\b)?",
    )
    .expect("valid regex")
});

/// A distance with a unit but no usable bearing, e.g. `"5 km along road"`.
static STRAY_DISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:[.,]\d+)?\s*(?:kilometres|kilometers|kms|km|miles|mile)\b\.?")
        .expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid regex"));

/// Kilometres per unit, keyed by the lowercase unit token.
const UNIT_TO_KM: &[(&str, f64)] = &[
    ("kilometres", 1.0),
    ("kilometers", 1.0),
    ("kms", 1.0),
    ("km", 1.0),
    ("metres", 0.001),
    ("meters", 0.001),
    ("m", 0.001),
    ("miles", 1.609_344),
    ("mile", 1.609_344),
    ("mi", 1.609_344),
];

/// Which side of the directional clause carried the anchor place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorForm {
    /// Text on both sides; the offset is discarded.
    Bracketed,
    /// Anchor follows the clause.
    Suffix,
    /// Anchor precedes the clause.
    Prefix,
    /// No usable clause was found.
    None,
}

/// Result of [`extract_direction`].
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionExtraction {
    /// The offset to apply once the anchor is resolved.
    pub direction: Option<Direction>,
    /// Locality text with the directional clause removed.
    pub residual: String,
    /// Which anchor form matched.
    pub form: AnchorForm,
    /// The offset dropped by the bracketed form.
    pub discarded: Option<Direction>,
    /// Text after the clause in the bracketed form.
    pub trailing_anchor: Option<String>,
}

impl DirectionExtraction {
    fn without_direction(residual: String) -> Self {
        Self {
            direction: None,
            residual,
            form: AnchorForm::None,
            discarded: None,
            trailing_anchor: None,
        }
    }
}

/// Finds an embedded "`<distance> <unit> <bearing> of <place>`" clause.
///
/// Distances are converted to kilometres. When no anchored clause is
/// found, stray distance tokens are stripped as noise and no direction is
/// returned.
#[must_use]
pub fn extract_direction(text: &str) -> DirectionExtraction {
    let Some(caps) = DIRECTION_CLAUSE_RE.captures(text) else {
        return DirectionExtraction::without_direction(strip_noise(text));
    };

    let Some(direction) = parse_direction(&caps) else {
        return DirectionExtraction::without_direction(strip_noise(text));
    };

    let Some(clause) = caps.get(0) else {
        return DirectionExtraction::without_direction(strip_noise(text));
    };

    let leading = trim_anchor(&text[..clause.start()]);
    let trailing = trim_anchor(&text[clause.end()..]);

    let extraction = match (leading.is_empty(), trailing.is_empty()) {
        (false, false) => DirectionExtraction {
            direction: None,
            residual: leading.to_string(),
            form: AnchorForm::Bracketed,
            discarded: Some(direction),
            trailing_anchor: Some(trailing.to_string()),
        },
        (true, false) => DirectionExtraction {
            direction: Some(direction),
            residual: trailing.to_string(),
            form: AnchorForm::Suffix,
            discarded: None,
            trailing_anchor: None,
        },
        (false, true) => DirectionExtraction {
            direction: Some(direction),
            residual: leading.to_string(),
            form: AnchorForm::Prefix,
            discarded: None,
            trailing_anchor: None,
        },
        (true, true) => DirectionExtraction::without_direction(strip_noise(text)),
    };

    log::trace!(
        "Direction in '{text}': {:?} -> '{}' ({:?})",
        extraction.direction,
        extraction.residual,
        extraction.form
    );

    extraction
}

fn parse_direction(caps: &Captures<'_>) -> Option<Direction> {
    let distance: f64 = caps
        .name("distance")?
        .as_str()
        .replace(',', ".")
        .parse()
        .ok()?;

    let unit = caps.name("unit")?.as_str().to_ascii_lowercase();
    let factor = UNIT_TO_KM
        .iter()
        .find(|(token, _)| *token == unit)
        .map(|(_, factor)| *factor)?;

    let bearing = Bearing::from_token(caps.name("bearing")?.as_str())?;

    Some(Direction {
        distance_km: distance * factor,
        bearing,
    })
}

fn strip_noise(text: &str) -> String {
    let text = DIRECTION_CLAUSE_RE.replace_all(text, " ");
    let text = STRAY_DISTANCE_RE.replace_all(&text, " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    trim_anchor(&text).to_string()
}

fn trim_anchor(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '('))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_form_discards_direction() {
        let result = extract_direction("Muizenberg, 20 km SE of Tokai");
        assert_eq!(result.direction, None);
        assert_eq!(result.residual, "Muizenberg");
        assert_eq!(result.form, AnchorForm::Bracketed);
        assert_eq!(
            result.discarded,
            Some(Direction {
                distance_km: 20.0,
                bearing: Bearing::SE
            })
        );
        assert_eq!(result.trailing_anchor.as_deref(), Some("Tokai"));
    }

    #[test]
    fn suffix_anchor_form() {
        let result = extract_direction("40 km W from Muizenberg");
        assert_eq!(
            result.direction,
            Some(Direction {
                distance_km: 40.0,
                bearing: Bearing::W
            })
        );
        assert_eq!(result.residual, "Muizenberg");
        assert_eq!(result.form, AnchorForm::Suffix);
    }

    #[test]
    fn prefix_anchor_form() {
        let result = extract_direction("Muizenberg 40km W");
        assert_eq!(
            result.direction,
            Some(Direction {
                distance_km: 40.0,
                bearing: Bearing::W
            })
        );
        assert_eq!(result.residual, "Muizenberg");
        assert_eq!(result.form, AnchorForm::Prefix);
    }

    #[test]
    fn spelled_intercardinal_bearing() {
        let result = extract_direction("12 km north-east of Springbok");
        let direction = result.direction.unwrap();
        assert_eq!(direction.bearing, Bearing::NE);
        assert_eq!(result.residual, "Springbok");
    }

    #[test]
    fn dotted_intercardinal_before_anchor() {
        let result = extract_direction("10 km N.E. of Springbok");
        assert_eq!(
            result.direction,
            Some(Direction {
                distance_km: 10.0,
                bearing: Bearing::NE
            })
        );
        assert_eq!(result.residual, "Springbok");
        assert_eq!(result.form, AnchorForm::Suffix);
    }

    #[test]
    fn dotted_intercardinal_after_anchor() {
        let result = extract_direction("Springbok 10 km S.W.");
        assert_eq!(result.direction.unwrap().bearing, Bearing::SW);
        assert_eq!(result.residual, "Springbok");
        assert_eq!(result.form, AnchorForm::Prefix);
    }

    #[test]
    fn spaced_intercardinals() {
        let result = extract_direction("Springbok 10 km S. W.");
        assert_eq!(result.direction.unwrap().bearing, Bearing::SW);
        assert_eq!(result.form, AnchorForm::Prefix);

        let result = extract_direction("8 km N E of Garies");
        assert_eq!(result.direction.unwrap().bearing, Bearing::NE);
        assert_eq!(result.residual, "Garies");

        let result = extract_direction("3 km n. w. from Kamieskroon");
        assert_eq!(result.direction.unwrap().bearing, Bearing::NW);
        assert_eq!(result.residual, "Kamieskroon");
    }

    #[test]
    fn dotted_single_letter_bearing() {
        let result = extract_direction("Muizenberg 40 km W.");
        assert_eq!(result.direction.unwrap().bearing, Bearing::W);
        assert_eq!(result.form, AnchorForm::Prefix);
    }

    #[test]
    fn letter_then_place_is_not_an_intercardinal() {
        let result = extract_direction("6 km S Elandsbaai");
        assert_eq!(result.direction.unwrap().bearing, Bearing::S);
        assert_eq!(result.residual, "Elandsbaai");
    }

    #[test]
    fn trailing_fragment_forces_bracketed_form() {
        let result = extract_direction("Muizenberg 40 km W, roadside");
        assert_eq!(result.form, AnchorForm::Bracketed);
        assert_eq!(result.direction, None);
        assert_eq!(result.residual, "Muizenberg");
        assert_eq!(result.trailing_anchor.as_deref(), Some("roadside"));
        assert_eq!(
            result.discarded,
            Some(Direction {
                distance_km: 40.0,
                bearing: Bearing::W
            })
        );
    }

    #[test]
    fn converts_miles_to_kilometres() {
        let result = extract_direction("10 miles S of Clanwilliam");
        let direction = result.direction.unwrap();
        assert!((direction.distance_km - 16.093_44).abs() < 1e-9);
        assert_eq!(direction.bearing, Bearing::S);
    }

    #[test]
    fn converts_metres_to_kilometres() {
        let result = extract_direction("500 m E of Tokai");
        let direction = result.direction.unwrap();
        assert!((direction.distance_km - 0.5).abs() < 1e-9);
    }

    #[test]
    fn accepts_comma_decimal_distance() {
        let result = extract_direction("2,5 km N of Tokai");
        let direction = result.direction.unwrap();
        assert!((direction.distance_km - 2.5).abs() < 1e-9);
    }

    #[test]
    fn connector_is_optional() {
        let result = extract_direction("15 km NW Calvinia");
        assert_eq!(result.direction.unwrap().bearing, Bearing::NW);
        assert_eq!(result.residual, "Calvinia");
    }

    #[test]
    fn bearing_needs_word_boundary() {
        // "West" must not be read as "W" followed by "est".
        let result = extract_direction("Muizenberg 40 km West");
        assert_eq!(result.direction.unwrap().bearing, Bearing::W);
        assert_eq!(result.residual, "Muizenberg");
    }

    #[test]
    fn farm_number_is_not_a_distance() {
        let result = extract_direction("On the farm Rietfontein 234, 10 km N of Springbok");
        assert_eq!(result.form, AnchorForm::Bracketed);
        assert_eq!(result.residual, "On the farm Rietfontein 234");
        assert_eq!(
            result.discarded,
            Some(Direction {
                distance_km: 10.0,
                bearing: Bearing::N
            })
        );
    }

    #[test]
    fn no_clause_leaves_text() {
        let result = extract_direction("Muizenberg");
        assert_eq!(result.direction, None);
        assert_eq!(result.residual, "Muizenberg");
        assert_eq!(result.form, AnchorForm::None);
    }

    #[test]
    fn strips_stray_distance_without_bearing() {
        let result = extract_direction("Springbok 5 km along the road");
        assert_eq!(result.direction, None);
        assert_eq!(result.residual, "Springbok along the road");
    }

    #[test]
    fn clause_without_anchor_leaves_nothing() {
        let result = extract_direction("20 km SE of");
        assert_eq!(result.direction, None);
        assert_eq!(result.residual, "");
    }
}
