//! Session configuration.
//!
//! Every field has a default, so an empty JSON object (or no config file at
//! all) yields a working configuration. The built-in stop-word and
//! abbreviation sets are fixed; the `extra*` lists extend them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FillError, FillResult};

/// Default number of characters of context captured on each side of a blank.
pub const DEFAULT_CONTEXT_WINDOW: usize = 200;

/// Default upper bound for an external question phraser.
pub const DEFAULT_PHRASING_TIMEOUT_MS: u64 = 3000;

/// An open/close pair wrapped around a span of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub open: String,
    pub close: String,
}

impl Marker {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Wrap `inner` in this marker.
    pub fn wrap(&self, inner: &str) -> String {
        let mut out = String::with_capacity(self.open.len() + inner.len() + self.close.len());
        out.push_str(&self.open);
        out.push_str(inner);
        out.push_str(&self.close);
        out
    }
}

/// Configuration shared by extraction, substitution, and the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillConfig {
    /// Normalized keys rejected in addition to the built-in stop words.
    pub extra_stop_words: Vec<String>,
    /// Lowercase words rendered fully uppercase in generated labels.
    pub extra_abbreviations: Vec<String>,
    /// Marks an answered placeholder in preview renderings.
    pub filled_marker: Marker,
    /// Marks the placeholder for the question currently being asked.
    pub active_marker: Marker,
    /// Timeout for external question phrasing before the template is used.
    pub phrasing_timeout_ms: u64,
    /// Characters of context captured on each side of a blank.
    pub context_window: usize,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            extra_stop_words: Vec::new(),
            extra_abbreviations: Vec::new(),
            filled_marker: Marker::new(r#"<span class="filled">"#, "</span>"),
            active_marker: Marker::new(r#"<mark class="active">"#, "</mark>"),
            phrasing_timeout_ms: DEFAULT_PHRASING_TIMEOUT_MS,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl FillConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> FillResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| FillError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make markers unrecoverable.
    pub fn validate(&self) -> FillResult<()> {
        for (name, marker) in [("filledMarker", &self.filled_marker), ("activeMarker", &self.active_marker)] {
            if marker.open.is_empty() || marker.close.is_empty() {
                return Err(FillError::Config(format!("{name} open/close must be non-empty")));
            }
        }
        if self.filled_marker.open == self.active_marker.open {
            return Err(FillError::Config(
                "filledMarker and activeMarker must differ".to_owned(),
            ));
        }
        Ok(())
    }
}
