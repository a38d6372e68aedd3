//! Locality text normalization.
//!
//! Rewrites raw label text into a canonical form before any extraction:
//! reserve abbreviations are expanded, cataloguing preambles are stripped
//! and trailing annotations are cut off. Re-running [`normalize`] on its own
//! output is a no-op.

use regex::Regex;
use std::sync::LazyLock;

/// "Nat. Park", "nat park", "Nat.Pk".
static NAT_PARK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnat(?:\.\s*|\s+)(?:park|pk)\b\.?").expect("valid regex")
});

/// "Nat. Res.", "nat reserve", "Nature Res."
static NAT_RES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnat(?:\.\s*|\s+|ure\s+)res(?:erve)?\b\.?").expect("valid regex")
});

/// Bare "N.R." / "NR" initialism. Case-sensitive: lowercase "nr" means
/// "near".
static NR_INITIALISM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)N\.?\s?R\.?([\s,;]|$)").expect("valid regex")
});

/// Bare "N.P." / "NP" / "Nat P." initialism. Case-sensitive.
static NP_INITIALISM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)N(?:at)?\.?\s?P(?:ark)?\.?([\s,;]|$)").expect("valid regex")
});

/// Canonical protected-area names, after rewriting.
static PROTECTED_AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:national\s+park|nature\s+reserve)\b").expect("valid regex")
});

/// "Snake collected from ...", "collected from ...".
static COLLECTED_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[\w-]+\s+)?collected\s+from\b\s*").expect("valid regex")
});

/// Cataloguing grid-cell code such as "3218KR " or "123S ".
static GRID_CODE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{3,4}K?[RSTUV]\s+").expect("valid regex"));

/// Phrases after which nothing useful follows. Each truncates the text at
/// its first occurrence.
static LOW_VALUE_PHRASES_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"along\s+the\s+top\s+of",
        r"at\s+the\s+bottom\s+of",
        r"nearby",
        r"next\s+to",
    ]
    .iter()
    .map(|phrase| Regex::new(&format!(r"(?is)\s*\b{phrase}\b.*$")).expect("valid regex"))
    .collect()
});

/// Upper bound on normalization passes. Every pass either shrinks the text
/// or rewrites an abbreviation into a form no pattern matches again.
const MAX_PASSES: usize = 4;

/// Normalized locality text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLocality {
    /// The rewritten text.
    pub text: String,
    /// Whether the text names a national park or nature reserve.
    pub is_protected_area: bool,
}

/// Normalizes a raw locality string.
///
/// The pipeline:
/// 1. Expand "National Park" / "Nature Reserve" abbreviations
/// 2. Strip a leading "[word] collected from" preamble
/// 3. Strip a leading grid-cell code ("3218KR ")
/// 4. Truncate at low-value phrases ("nearby", "next to", ...)
/// 5. Truncate at the first `;`
/// 6. Trim whitespace and stray commas
///
/// Passes repeat until the text is stable.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedLocality {
    let mut text = raw.to_string();
    let mut rewrote_reserve = false;

    for _ in 0..MAX_PASSES {
        let (next, rewrote) = normalize_pass(&text);
        rewrote_reserve |= rewrote;
        if next == text {
            break;
        }
        text = next;
    }

    let is_protected_area = rewrote_reserve || PROTECTED_AREA_RE.is_match(&text);

    if text != raw {
        log::trace!("Normalized '{raw}' to '{text}'");
    }

    NormalizedLocality {
        text,
        is_protected_area,
    }
}

fn normalize_pass(input: &str) -> (String, bool) {
    let (text, rewrote) = expand_reserve_abbreviations(input);
    let text = strip_preambles(&text);
    let text = truncate_low_value_phrases(&text);
    let text = truncate_annotation(&text);
    (trim_separators(text).to_string(), rewrote)
}

/// Returns the rewritten text and whether any abbreviation was expanded.
fn expand_reserve_abbreviations(input: &str) -> (String, bool) {
    let text = NAT_PARK_RE.replace_all(input, "National Park");
    let text = NAT_RES_RE.replace_all(&text, "Nature Reserve");
    let text = NR_INITIALISM_RE.replace_all(&text, "${1}Nature Reserve${2}");
    let text = NP_INITIALISM_RE.replace_all(&text, "${1}National Park${2}");

    let rewrote = text != input;
    (text.into_owned(), rewrote)
}

fn strip_preambles(input: &str) -> String {
    let mut text = trim_separators(input).to_string();
    loop {
        let stripped = COLLECTED_FROM_RE.replace(&text, "");
        let stripped = GRID_CODE_PREFIX_RE.replace(&stripped, "");
        if stripped == text {
            return text;
        }
        text = trim_separators(&stripped).to_string();
    }
}

fn truncate_low_value_phrases(input: &str) -> String {
    LOW_VALUE_PHRASES_RE
        .iter()
        .fold(input.to_string(), |text, phrase| {
            phrase.replace(&text, "").into_owned()
        })
}

fn truncate_annotation(input: &str) -> &str {
    input.split(';').next().unwrap_or_default()
}

fn trim_separators(input: &str) -> &str {
    input.trim_matches(|c: char| c.is_whitespace() || c == ',')
}
