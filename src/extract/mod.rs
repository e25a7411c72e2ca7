//! Placeholder extraction.
//!
//! Builds a [`DocumentSchema`] from the plain-text and markup renditions of
//! one document.
//!
//! # Pipeline
//!
//! 1. Scan the plain text. Blanks get `blank_<n>` keys by position; named
//!    candidates are normalized and filtered (stop words, numerics, length).
//! 2. Scan the markup. New spellings of already-known named keys are added
//!    as surface forms; markup never mints a key of its own.
//! 3. Locate each key's first occurrence in the plain text and order keys
//!    by it (unlocated keys last, in discovery order).
//! 4. Label every key: dictionary/title case for named keys, the
//!    [`blank`] rule cascade for blanks.

pub mod blank;
pub mod labels;
pub mod normalize;
pub mod scan;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::config::FillConfig;
use crate::error::FillResult;
use crate::fill::matchers::find_ascii_ci;
use crate::markup;
use crate::schema::{DocumentSchema, PlaceholderKey, PlaceholderRecord, ValueType};

use self::scan::CandidateKind;

/// Build the placeholder schema for one document.
///
/// `plain` and `markup` must derive from the same source document. Finding
/// no placeholders is not an error: the schema is simply empty.
///
/// # Errors
///
/// Returns [`crate::FillError::Decode`] if `markup` cannot be walked as
/// markup.
pub fn extract(plain: &str, markup: &str, config: &FillConfig) -> FillResult<DocumentSchema> {
    markup::validate(markup)?;

    let mut discovered: Vec<PlaceholderKey> = Vec::new();
    let mut surface_forms: BTreeMap<PlaceholderKey, BTreeSet<String>> = BTreeMap::new();
    let mut blank_by_offset: BTreeMap<usize, PlaceholderKey> = BTreeMap::new();

    for candidate in scan::scan(plain) {
        match candidate.kind {
            CandidateKind::Blank => {
                let next = blank_by_offset.len();
                blank_by_offset.entry(candidate.start).or_insert_with(|| {
                    let key = PlaceholderKey::blank(next);
                    discovered.push(key.clone());
                    key
                });
            }
            CandidateKind::Named => {
                match normalize::named_key(candidate.inner, &config.extra_stop_words) {
                    Ok(key) => {
                        if !surface_forms.contains_key(&key) {
                            discovered.push(key.clone());
                        }
                        surface_forms
                            .entry(key)
                            .or_default()
                            .insert(candidate.surface.to_owned());
                    }
                    Err(reason) => {
                        trace!(surface = candidate.surface, ?reason, "candidate rejected");
                    }
                }
            }
        }
    }

    let mut markup_variants = 0usize;
    for candidate in scan::scan(markup) {
        if candidate.kind != CandidateKind::Named {
            continue;
        }
        let Ok(key) = normalize::named_key(candidate.inner, &config.extra_stop_words) else {
            continue;
        };
        if let Some(forms) = surface_forms.get_mut(&key) {
            if forms.insert(candidate.surface.to_owned()) {
                markup_variants += 1;
            }
        }
    }

    let blank_starts: Vec<(usize, usize)> = scan::scan_blanks(plain)
        .iter()
        .map(|c| (c.start, c.end))
        .collect();

    let mut ordered: Vec<(Option<usize>, PlaceholderKey)> = discovered
        .into_iter()
        .map(|key| {
            let offset = match key.blank_index() {
                Some(n) => blank_starts.get(n).map(|(start, _)| *start),
                None => first_offset(plain, surface_forms.get(&key)),
            };
            (offset, key)
        })
        .collect();
    ordered.sort_by_key(|(offset, _)| (offset.is_none(), *offset));

    let records = ordered
        .into_iter()
        .enumerate()
        .map(|(i, (_, key))| {
            let label = match key.blank_index() {
                Some(n) => blank_label(plain, blank_starts.get(n).copied(), n, config.context_window),
                None => labels::label_for_key(key.as_str(), &config.extra_abbreviations),
            };
            PlaceholderRecord {
                key,
                label,
                value_type: ValueType::String,
                position: i + 1,
                value: None,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        keys = records.len(),
        blanks = blank_by_offset.len(),
        markup_variants,
        "placeholders extracted"
    );

    Ok(DocumentSchema {
        records,
        surface_forms,
    })
}

/// Smallest case-insensitive offset of any surface form in `plain`.
fn first_offset(plain: &str, forms: Option<&BTreeSet<String>>) -> Option<usize> {
    forms?
        .iter()
        .filter_map(|form| find_ascii_ci(plain, form, 0))
        .min()
}

fn blank_label(plain: &str, span: Option<(usize, usize)>, index: usize, window: usize) -> String {
    let Some((start, end)) = span else {
        return blank::label_for_blank(index, "", "");
    };
    let before = blank::tail_chars(&plain[..start], window);
    let after = blank::head_chars(&plain[end..], window);
    blank::label_for_blank(index, before, after)
}
