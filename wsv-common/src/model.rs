//! Domain model for musical work records
//!
//! A work carries an optional title, an optional ISWC identifier, and a
//! list of contributors. Raw records keep contributors in input order;
//! canonical rows store them as a `ContributorSet` (unique, sorted).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// ISWC pattern: letter T, then three groups of three digits and one check
/// digit, each group optionally preceded by a `-` or `.` separator.
static ISWC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^T[-.]?[0-9]{3}[-.]?[0-9]{3}[-.]?[0-9]{3}[-.]?[0-9]$")
        .expect("ISWC regex is valid")
});

/// Check a candidate identifier against the ISWC pattern.
pub fn is_valid_iswc(candidate: &str) -> bool {
    ISWC_REGEX.is_match(candidate)
}

/// One raw work record as normalized from an input row.
///
/// Contributors are split and trimmed but kept in input order and not
/// deduplicated; joint deduplication against canonical state happens
/// during reconciliation. Empty title/identifier strings are normalized
/// to `None`. This is also the staging-row shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRecord {
    pub title: Option<String>,
    pub contributors: Vec<String>,
    pub iswc: Option<String>,
}

impl WorkRecord {
    pub fn new(
        title: Option<String>,
        contributors: Vec<String>,
        iswc: Option<String>,
    ) -> Self {
        Self {
            title,
            contributors,
            iswc,
        }
    }
}

/// Deduplicated, deterministically ordered contributor set.
///
/// Insertion preserves uniqueness and iteration yields lexicographic
/// order, so any sequence of unions produces the same stored list
/// regardless of merge order. Serializes as a sorted JSON array, the
/// on-disk encoding for the `contributors` TEXT column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributorSet(BTreeSet<String>);

impl ContributorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one contributor; returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// True when at least one of `names` is in the set (the fuzzy-linkage
    /// intersection test; case-sensitive exact match).
    pub fn shares_any(&self, names: &[String]) -> bool {
        names.iter().any(|name| self.0.contains(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Sorted JSON array encoding for storage.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize contributors: {}", e)))
    }

    /// Decode from a stored JSON array; duplicates collapse on the way in.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Internal(format!("Invalid contributors JSON: {}", e)))
    }
}

impl FromIterator<String> for ContributorSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<String> for ContributorSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl From<Vec<String>> for ContributorSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}
