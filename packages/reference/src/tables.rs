//! Lookup tables that shape reference records: gazetteer source priorities
//! and province-name aliases.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{ReferenceError, open_csv};

#[derive(Debug, Deserialize)]
struct PriorityRow {
    #[serde(alias = "code", alias = "source_code")]
    source: String,
    #[serde(alias = "tier", alias = "rank")]
    priority: u32,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    alias: String,
    #[serde(alias = "canonical", alias = "name")]
    province: String,
}

/// Gazetteer source code to trust tier. Lower is more trustworthy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePriorities {
    tiers: BTreeMap<String, u32>,
}

impl SourcePriorities {
    #[must_use]
    pub fn new(tiers: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self {
            tiers: tiers
                .into_iter()
                .map(|(code, tier)| (normalize_key(&code), tier))
                .collect(),
        }
    }

    /// Reads `source,priority` rows.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::InvalidRow`] for a row without a numeric
    /// priority and [`ReferenceError::Csv`] if the header cannot be read.
    pub fn from_reader(reader: impl Read, label: &str) -> Result<Self, ReferenceError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut tiers = BTreeMap::new();
        for (index, result) in csv_reader.deserialize::<PriorityRow>().enumerate() {
            let row = result.map_err(|e| ReferenceError::InvalidRow {
                path: label.to_string(),
                line: index as u64 + 2,
                message: e.to_string(),
            })?;
            tiers.insert(normalize_key(&row.source), row.priority);
        }

        log::debug!("Loaded {} source priorities from {label}", tiers.len());

        Ok(Self { tiers })
    }

    /// Reads the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or a row is invalid.
    pub fn from_path(path: &Path) -> Result<Self, ReferenceError> {
        let file = open_csv(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Tier assigned to codes missing from the table: one worse than the
    /// worst known tier.
    #[must_use]
    pub fn worst_tier(&self) -> u32 {
        self.tiers.values().max().map_or(1, |tier| tier.saturating_add(1))
    }

    /// Tier of `code`, or [`Self::worst_tier`] when unknown.
    #[must_use]
    pub fn priority_of(&self, code: &str) -> u32 {
        self.tiers
            .get(&normalize_key(code))
            .copied()
            .unwrap_or_else(|| self.worst_tier())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Province spellings ("N Cape", "Northern Cape Province", "NC") mapped to
/// one canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvinceAliases {
    aliases: BTreeMap<String, String>,
}

impl ProvinceAliases {
    #[must_use]
    pub fn new(aliases: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(alias, province)| (normalize_key(&alias), province.trim().to_string()))
                .collect(),
        }
    }

    /// Reads `alias,province` rows. Malformed rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Csv`] if the header cannot be read.
    pub fn from_reader(reader: impl Read, label: &str) -> Result<Self, ReferenceError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        csv_reader.headers().map_err(|e| ReferenceError::Csv {
            path: label.to_string(),
            source: e,
        })?;

        let mut aliases = BTreeMap::new();
        for result in csv_reader.deserialize::<AliasRow>() {
            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    log::trace!("  skipping malformed alias row: {e}");
                    continue;
                }
            };
            aliases.insert(normalize_key(&row.alias), row.province);
        }

        log::debug!("Loaded {} province aliases from {label}", aliases.len());

        Ok(Self { aliases })
    }

    /// Reads the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    pub fn from_path(path: &Path) -> Result<Self, ReferenceError> {
        let file = open_csv(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Canonical province name for `name`; unknown names come back
    /// trimmed.
    #[must_use]
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases
            .get(&normalize_key(name))
            .map_or_else(|| name.trim(), String::as_str)
    }

    /// Whether two province spellings name the same province.
    #[must_use]
    pub fn same_province(&self, a: &str, b: &str) -> bool {
        self.canonical(a).eq_ignore_ascii_case(self.canonical(b))
    }
}

fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
