//! Placeholder schema types.
//!
//! A [`DocumentSchema`] is built once per loaded template by
//! [`crate::extract::extract`] and is never updated incrementally; loading a
//! new template replaces it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by all positional blank keys.
pub const BLANK_PREFIX: &str = "blank_";

/// Normalized identity of one semantic field (`company_name`) or one
/// positional blank (`blank_3`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderKey(String);

impl PlaceholderKey {
    /// Wrap an already-normalized key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for the `index`-th blank in document order (0-based).
    pub fn blank(index: usize) -> Self {
        Self(format!("{BLANK_PREFIX}{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The blank counter if this is a positional blank key.
    pub fn blank_index(&self) -> Option<usize> {
        self.0.strip_prefix(BLANK_PREFIX)?.parse().ok()
    }

    pub fn is_blank(&self) -> bool {
        self.blank_index().is_some()
    }
}

impl fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceholderKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Value type of a placeholder. Only free text exists today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
}

/// One field the user is asked to fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderRecord {
    pub key: PlaceholderKey,
    pub label: String,
    pub value_type: ValueType,
    /// 1-based rank of the key's first occurrence in the document.
    pub position: usize,
    pub value: Option<String>,
}

/// Ordered placeholder records plus every surface spelling seen per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSchema {
    pub records: Vec<PlaceholderRecord>,
    /// Literal spellings per named key. Blank keys have no entry: they are
    /// matched positionally, never lexically.
    pub surface_forms: BTreeMap<PlaceholderKey, BTreeSet<String>>,
}

impl DocumentSchema {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, key: &PlaceholderKey) -> bool {
        self.records.iter().any(|r| &r.key == key)
    }

    pub fn record(&self, key: &PlaceholderKey) -> Option<&PlaceholderRecord> {
        self.records.iter().find(|r| &r.key == key)
    }

    pub(crate) fn record_mut(&mut self, key: &PlaceholderKey) -> Option<&mut PlaceholderRecord> {
        self.records.iter_mut().find(|r| &r.key == key)
    }

    /// Surface forms recorded for `key` (empty for blank keys).
    pub fn forms(&self, key: &PlaceholderKey) -> impl Iterator<Item = &str> {
        self.surface_forms
            .get(key)
            .into_iter()
            .flat_map(|forms| forms.iter().map(String::as_str))
    }

    /// All blank keys ordered by their blank counter.
    pub fn blank_keys(&self) -> Vec<PlaceholderKey> {
        let mut blanks: Vec<(usize, PlaceholderKey)> = self
            .records
            .iter()
            .filter_map(|r| r.key.blank_index().map(|i| (i, r.key.clone())))
            .collect();
        blanks.sort_by_key(|(i, _)| *i);
        blanks.into_iter().map(|(_, k)| k).collect()
    }
}

/// Answers collected during a fill session, keyed by placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<PlaceholderKey, String>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, returning the previous value for the key if any.
    pub fn insert(&mut self, key: PlaceholderKey, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    pub fn get(&self, key: &PlaceholderKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Usable answer for `key`: empty or whitespace-only values count as
    /// unanswered.
    pub fn answer(&self, key: &PlaceholderKey) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn is_answered(&self, key: &PlaceholderKey) -> bool {
        self.answer(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlaceholderKey, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<PlaceholderKey>, V: Into<String>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
