#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Matching a cleaned locality name against one reference dataset.
//!
//! Candidates are gathered by the first of these that finds anything:
//! 1. Farm number: records whose name (or registered number) carries the
//!    query's farm number
//! 2. Exact: records whose name contains the query, case-insensitively
//! 3. Fuzzy: records at the best token-set score, if that score clears the
//!    threshold. Skipped for names too common to score meaningfully
//!    ("Rietfontein", "Fountain").
//!
//! The surviving candidates are narrowed by QDS cell, then priority, then
//! feature type, each filter only applied when it leaves something, and
//! the one nearest the prior coordinate wins.

pub mod fuzzy;

use georef_geodesy::distance_km;
use georef_locality_models::{Coordinate, FeatureType, LocalityRecord, Qds, ReferenceDataset};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum fuzzy score (0-100) for a candidate to be considered.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 90;

/// Default pattern for names too common to fuzzy-match.
pub const DEFAULT_COMMON_NAME_PATTERN: &str = "fou?nt[ae]in";

/// Errors building a [`ReferenceMatcher`].
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The common-name pattern is not a valid regex.
    #[error("Invalid common-name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Matching thresholds, the `[matching]` table of the batch config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum token-set score (0-100).
    pub fuzzy_threshold: u8,
    /// Case-insensitive pattern of names that skip fuzzy matching.
    pub common_name_pattern: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            common_name_pattern: DEFAULT_COMMON_NAME_PATTERN.to_string(),
        }
    }
}

/// What the resolver is looking for.
#[derive(Debug, Clone, Copy)]
pub struct MatchQuery<'a> {
    /// Cleaned name to look up.
    pub text: &'a str,
    /// Expected category of the place.
    pub feature_type: FeatureType,
    /// Farm number from the label, if any.
    pub farm_number: Option<u32>,
    /// Point to measure candidate proximity from.
    pub prior: Coordinate,
    /// QDS cell of the input row.
    pub qds: &'a Qds,
}

/// How the candidate set was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    FarmNumber(u32),
    Exact,
    Fuzzy { score: u8 },
}

/// A selected record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub record: &'a LocalityRecord,
    pub method: MatchMethod,
    /// Size of the candidate set before disambiguation.
    pub candidates: usize,
}

impl Match<'_> {
    /// Whether more than one candidate had to be narrowed down.
    #[must_use]
    pub const fn disambiguated(&self) -> bool {
        self.candidates > 1
    }
}

/// Best fuzzy candidate that fell short of the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosestMiss {
    pub name: String,
    pub score: u8,
}

/// Outcome of matching against one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport<'a> {
    /// Name of the dataset searched.
    pub dataset: &'a str,
    pub matched: Option<Match<'a>>,
    /// Set when fuzzy scoring ran and nothing cleared the threshold.
    pub closest: Option<ClosestMiss>,
    /// Set when fuzzy scoring was skipped for a common name.
    pub fuzzy_skipped: bool,
}

impl MatchReport<'_> {
    /// Human-readable remark for the output notes.
    #[must_use]
    pub fn note(&self) -> String {
        let dataset = self.dataset;

        if let Some(found) = &self.matched {
            let name = &found.record.name;
            let mut note = match found.method {
                MatchMethod::FarmNumber(number) => {
                    format!("Farm number {number} matched in {dataset}. Matched = {name}")
                }
                MatchMethod::Exact => format!("Matched exactly in {dataset}. Matched = {name}"),
                MatchMethod::Fuzzy { score } => format!(
                    "Fuzzy matching using {dataset}. Best match = {name} \
                     with certainty of {score}"
                ),
            };
            if found.disambiguated() {
                note.push_str(&format!(
                    ", closest of {} candidates after disambiguation",
                    found.candidates
                ));
            }
            return note;
        }

        if self.fuzzy_skipped {
            return format!("No match in {dataset}, no fuzzy matching as name is too common");
        }

        match &self.closest {
            Some(miss) => format!(
                "No match in {dataset}. Closest match {} with certainty of {}",
                miss.name, miss.score
            ),
            None => format!("No match in {dataset}"),
        }
    }
}

/// Selects one record from a dataset for a query.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    fuzzy_threshold: u8,
    common_name: Regex,
}

impl Default for ReferenceMatcher {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            common_name: Regex::new(&format!("(?i){DEFAULT_COMMON_NAME_PATTERN}"))
                .expect("valid regex"),
        }
    }
}

impl ReferenceMatcher {
    /// Builds a matcher from config.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::InvalidPattern`] if the common-name pattern
    /// does not compile.
    pub fn new(config: &MatcherConfig) -> Result<Self, MatcherError> {
        let common_name = Regex::new(&format!("(?i){}", config.common_name_pattern)).map_err(
            |source| MatcherError::InvalidPattern {
                pattern: config.common_name_pattern.clone(),
                source,
            },
        )?;

        Ok(Self {
            fuzzy_threshold: config.fuzzy_threshold,
            common_name,
        })
    }

    /// Whether `name` is too common to fuzzy-match.
    #[must_use]
    pub fn is_common_name(&self, name: &str) -> bool {
        self.common_name.is_match(name)
    }

    /// Matches `query` against every record of `dataset`.
    ///
    /// A query with no name text but a farm number ("Farm 234") is matched
    /// on the number alone.
    #[must_use]
    pub fn find<'a>(
        &self,
        query: &MatchQuery<'_>,
        dataset: &'a ReferenceDataset,
    ) -> MatchReport<'a> {
        let mut report = MatchReport {
            dataset: &dataset.name,
            matched: None,
            closest: None,
            fuzzy_skipped: false,
        };

        let text = query.text.trim();
        if dataset.is_empty() || (text.is_empty() && query.farm_number.is_none()) {
            return report;
        }

        let numbered = query
            .farm_number
            .map(|number| (number, by_farm_number(text, number, &dataset.records)))
            .filter(|(_, found)| !found.is_empty());

        let (candidates, method) = if let Some((number, candidates)) = numbered {
            (candidates, MatchMethod::FarmNumber(number))
        } else if text.is_empty() {
            return report;
        } else {
            let exact = by_substring(text, &dataset.records);
            if !exact.is_empty() {
                (exact, MatchMethod::Exact)
            } else if self.is_common_name(text) {
                report.fuzzy_skipped = true;
                log::debug!(
                    "Skipping fuzzy match for common name '{text}' in {}",
                    dataset.name
                );
                return report;
            } else {
                match self.by_fuzzy_score(text, &dataset.records) {
                    Ok((candidates, score)) => (candidates, MatchMethod::Fuzzy { score }),
                    Err(miss) => {
                        log::debug!(
                            "No fuzzy match for '{text}' in {}: closest {miss:?}",
                            dataset.name
                        );
                        report.closest = miss;
                        return report;
                    }
                }
            }
        };

        let count = candidates.len();
        report.matched = disambiguate(candidates, query).map(|record| Match {
            record,
            method,
            candidates: count,
        });

        if let Some(found) = &report.matched {
            log::debug!(
                "Matched '{text}' to '{}' in {} ({:?}, {count} candidates)",
                found.record.name,
                dataset.name,
                found.method
            );
        }

        report
    }

    /// Records tied at the best token-set score, or the closest miss when
    /// the best score is below the threshold.
    fn by_fuzzy_score<'a>(
        &self,
        text: &str,
        records: &'a [LocalityRecord],
    ) -> Result<(Vec<&'a LocalityRecord>, u8), Option<ClosestMiss>> {
        let scored: Vec<(u8, &LocalityRecord)> = records
            .iter()
            .map(|record| (fuzzy::token_set_ratio(text, &record.name), record))
            .collect();

        let Some(best) = scored.iter().map(|(score, _)| *score).max() else {
            return Err(None);
        };

        if best < self.fuzzy_threshold {
            let miss = scored
                .iter()
                .find(|(score, _)| *score == best)
                .map(|(score, record)| ClosestMiss {
                    name: record.name.clone(),
                    score: *score,
                });
            return Err(miss);
        }

        let candidates = scored
            .into_iter()
            .filter(|(score, _)| *score == best)
            .map(|(_, record)| record)
            .collect();

        Ok((candidates, best))
    }
}

/// Records carrying `number`, narrowed to those also containing `text` when
/// any do.
fn by_farm_number<'a>(
    text: &str,
    number: u32,
    records: &'a [LocalityRecord],
) -> Vec<&'a LocalityRecord> {
    let needle = number.to_string();
    let numbered: Vec<&LocalityRecord> = records
        .iter()
        .filter(|record| record.farm_number == Some(number) || record.name.contains(&needle))
        .collect();

    let query = text.to_lowercase();
    keep_if_any(numbered, |record| record.name.to_lowercase().contains(&query))
}

fn by_substring<'a>(text: &str, records: &'a [LocalityRecord]) -> Vec<&'a LocalityRecord> {
    let query = text.to_lowercase();
    records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&query))
        .collect()
}

/// Narrows `candidates` to one record.
///
/// Filters, in order, each applied only if it keeps at least one record:
/// 1. Same QDS cell as the query
/// 2. Lowest priority value present
/// 3. Feature type compatible with the query's (skipped for
///    [`FeatureType::Unknown`] queries)
///
/// Then the record nearest the prior wins; ties keep dataset order.
#[must_use]
pub fn disambiguate<'a>(
    candidates: Vec<&'a LocalityRecord>,
    query: &MatchQuery<'_>,
) -> Option<&'a LocalityRecord> {
    let candidates = keep_if_any(candidates, |record| query.qds.same_cell(&record.qds));

    let best_priority = candidates.iter().map(|record| record.priority).min()?;
    let candidates = keep_if_any(candidates, |record| record.priority == best_priority);

    let candidates = if query.feature_type == FeatureType::Unknown {
        candidates
    } else {
        keep_if_any(candidates, |record| {
            record.feature_type.is_compatible_with(query.feature_type)
        })
    };

    candidates.into_iter().min_by(|a, b| {
        distance_km(a.coordinate, query.prior).total_cmp(&distance_km(b.coordinate, query.prior))
    })
}

fn keep_if_any<'a>(
    candidates: Vec<&'a LocalityRecord>,
    keep: impl Fn(&LocalityRecord) -> bool,
) -> Vec<&'a LocalityRecord> {
    if candidates.iter().any(|record| keep(record)) {
        candidates.into_iter().filter(|record| keep(record)).collect()
    } else {
        candidates
    }
}
