//! Farm-name detection.
//!
//! Farms are recorded in several ways:
//! - Explicit: `"collected on the Farm Vrolijkheid 123, Western Cape"`
//! - Keyword only: `"Farm Rietfontein"`, `"Smith Farm"`
//! - Implicit: `"Vaalfontein 45"` (short name followed by a farm number)

use regex::Regex;
use std::sync::LazyLock;

/// "... on the farm ", "in farm ".
static ON_FARM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*?\b[oi]n\s+(?:the\s+)?farm\b\s*").expect("valid regex")
});

/// Leading "Farm ".
static LEADING_FARM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*farm\b\s*").expect("valid regex"));

/// Trailing " Farm" ("Smith Farm").
static TRAILING_FARM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+farm\s*$").expect("valid regex"));

/// A standalone three-digit farm number, optionally bracketed.
static FARM_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*[\[{(]?\s*\b(\d{3})\b\s*[\]})]?\s*").expect("valid regex")
});

/// Up to four words followed by a 2-4 digit number that is not the start
/// of a decimal.
static IMPLICIT_FARM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[A-Za-z-]+\s+){0,3}[A-Za-z-]+),?\s*[\[{(]?(\d{2,4})\b(?:$|[^.])")
        .expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid regex"));

/// Result of farm detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmDetection {
    /// Whether farm-shaped syntax was found.
    pub is_farm: bool,
    /// The farm name with keywords, trailing clauses and number removed.
    pub canonical_name: String,
    /// Registered farm number, if present.
    pub farm_number: Option<u32>,
}

/// Detects explicit farm phrasing and extracts the canonical farm name.
///
/// The pipeline:
/// 1. Rewrite "`<anything>` on/in [the] farm `<name>`" to "Farm `<name>`"
/// 2. Drop a leading "Farm" keyword (or trailing one) and, when the text
///    started with it, everything after the first comma
/// 3. Remove a standalone three-digit number and record it as the farm
///    number
///
/// `is_farm` is true when any keyword or farm number was found.
#[must_use]
pub fn detect_farm(text: &str) -> FarmDetection {
    let original = text.trim();

    let rewritten = ON_FARM_RE.replace(original, "Farm ");
    let mut is_farm = rewritten != original;

    let before_trailing_keyword = TRAILING_FARM_RE
        .captures(&rewritten)
        .map(|caps| caps[1].to_string());

    let mut name = if LEADING_FARM_RE.is_match(&rewritten) {
        is_farm = true;
        let without_keyword = LEADING_FARM_RE.replace(&rewritten, "");
        without_keyword
            .split(',')
            .next()
            .unwrap_or_default()
            .to_string()
    } else if let Some(name) = before_trailing_keyword {
        is_farm = true;
        name
    } else {
        rewritten.into_owned()
    };

    let found = FARM_NUMBER_RE.captures_iter(&name).find_map(|caps| {
        let digits = caps.get(1)?;
        if is_decimal_part(&name, digits.start(), digits.end()) {
            return None;
        }
        let number = digits.as_str().parse::<u32>().ok()?;
        Some((caps.get(0)?.range(), number))
    });
    let farm_number = found.map(|(range, number)| {
        name.replace_range(range, " ");
        number
    });
    is_farm |= farm_number.is_some();

    let canonical_name = tidy(&name);

    log::trace!(
        "Farm detection for '{text}': is_farm={is_farm} name='{canonical_name}' \
         number={farm_number:?}"
    );

    FarmDetection {
        is_farm,
        canonical_name,
        farm_number,
    }
}

/// Recognizes an implicit farm name: up to four alphabetic words directly
/// followed by a 2-4 digit number, with no "farm" keyword.
///
/// Returns `None` when the text does not have that shape.
#[must_use]
pub fn implicit_farm_name(text: &str) -> Option<FarmDetection> {
    let caps = IMPLICIT_FARM_RE.captures(text.trim())?;
    let canonical_name = tidy(&caps[1]);
    if canonical_name.is_empty() {
        return None;
    }
    let farm_number = caps[2].parse::<u32>().ok();

    Some(FarmDetection {
        is_farm: true,
        canonical_name,
        farm_number,
    })
}

/// Whether the digits at `start..end` sit on either side of a decimal
/// separator, as in `12.345` or `123,5`.
fn is_decimal_part(text: &str, start: usize, end: usize) -> bool {
    let digit_then_separator = text[..start]
        .strip_suffix(['.', ','])
        .is_some_and(|before| before.ends_with(|c: char| c.is_ascii_digit()));
    let separator_then_digit = text[end..]
        .strip_prefix(['.', ','])
        .is_some_and(|after| after.starts_with(|c: char| c.is_ascii_digit()));
    digit_then_separator || separator_then_digit
}

fn tidy(text: &str) -> String {
    WHITESPACE_RE
        .replace_all(text, " ")
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '-'))
        .to_string()
}
