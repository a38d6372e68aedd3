//! Token-set similarity on a 0-100 scale.
//!
//! Names are compared as sets of lowercase alphanumeric tokens so that word
//! order and partial overlap ("Groot Vaalfontein" vs "Vaalfontein Groot",
//! "Rietfontein" vs "Rietfontein Oos") do not sink the score.

use std::collections::BTreeSet;

/// Lowercases, maps every non-alphanumeric character to a space and trims.
#[must_use]
pub fn full_process(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Plain similarity of two strings, rounded to 0-100. Empty input scores 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Token-set ratio.
///
/// Both strings are split into token sets. With `common` the sorted
/// intersection, `a_rest`/`b_rest` the sorted leftovers, the score is the
/// best of:
/// - `ratio(common, common + a_rest)`
/// - `ratio(common, common + b_rest)`
/// - `ratio(common + a_rest, common + b_rest)`
///
/// A name fully contained in the other therefore scores 100.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a = full_process(a);
    let b = full_process(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a_tokens: BTreeSet<&str> = a.split_whitespace().collect();
    let b_tokens: BTreeSet<&str> = b.split_whitespace().collect();

    let common = join(a_tokens.intersection(&b_tokens).copied());
    let a_combined = concat(&common, &join(a_tokens.difference(&b_tokens).copied()));
    let b_combined = concat(&common, &join(b_tokens.difference(&a_tokens).copied()));

    [
        ratio(&common, &a_combined),
        ratio(&common, &b_combined),
        ratio(&a_combined, &b_combined),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

fn join<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}

fn concat(common: &str, rest: &str) -> String {
    format!("{common} {rest}").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processes_punctuation_and_case() {
        assert_eq!(full_process("  Groot-Vlakte, (Oos) "), "groot vlakte   oos");
    }

    #[test]
    fn identical_names_score_100() {
        assert_eq!(token_set_ratio("Vrolijkheid", "vrolijkheid"), 100);
    }

    #[test]
    fn word_order_does_not_matter() {
        assert_eq!(token_set_ratio("Groot Vlakte", "Vlakte Groot"), 100);
    }

    #[test]
    fn contained_name_scores_100() {
        assert_eq!(token_set_ratio("Kransvlei", "Kransvlei Oos"), 100);
    }

    #[test]
    fn single_typo_scores_above_threshold() {
        assert!(token_set_ratio("Vrolikheid", "Vrolijkheid") >= 90);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(token_set_ratio("Muizenberg", "Springbok") < 50);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(token_set_ratio("", "Springbok"), 0);
        assert_eq!(token_set_ratio("---", "Springbok"), 0);
        assert_eq!(ratio("", ""), 0);
    }
}
