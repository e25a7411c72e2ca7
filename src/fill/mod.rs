//! Substitution engine.
//!
//! Replaces answered placeholders in a markup body and reports the ones it
//! could not place.
//!
//! # Order of work
//!
//! 1. Answers are partitioned into blank and named keys; empty answers are
//!    skipped and unknown keys reported.
//! 2. Blanks are filled last-first, so a replacement never shifts a blank
//!    that is still waiting. A blank's occurrence index is its counter minus
//!    the number of lower-numbered blanks already filled.
//! 3. Named keys run through [`STRATEGY_CHAIN`]; the first strategy that
//!    finds anything replaces all of its matches and the rest are skipped.
//! 4. Every replaced span is recorded beside the body and shifted as later
//!    edits land, so later scans ignore inserted answers. Nothing is ever
//!    written into the body to mark them.
//!
//! Blanks are positional, so they are only filled when the body holds
//! exactly as many blanks as the schema. Otherwise every blank answer is
//! left out and the mismatch is reported.

pub mod matchers;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Marker;
use crate::markup;
use crate::schema::{AnswerMap, DocumentSchema, PlaceholderKey};

use self::matchers::{Match, TagTolerantMatcher};

/// How inserted answers are rendered.
#[derive(Debug, Clone, Copy, Default)]
pub enum FillMode<'a> {
    /// The escaped answer alone, for the generated document.
    #[default]
    Final,
    /// The escaped answer wrapped in a marker, for preview renderings.
    Highlight(&'a Marker),
}

/// A placeholder that could not be filled. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FillIssue {
    /// No strategy located any occurrence of a named key.
    SurfaceFormNotFound { key: PlaceholderKey },
    /// The body holds fewer unfilled blanks than the key's occurrence index.
    BlankOccurrenceMissing {
        key: PlaceholderKey,
        occurrence: usize,
    },
    /// The answer names a key the schema does not contain.
    UnknownKey { key: PlaceholderKey },
    /// The body and the schema disagree on the number of blanks, so no
    /// blank answer could be placed by position.
    BlankCountMismatch {
        expected: usize,
        found: usize,
        unplaced: Vec<PlaceholderKey>,
    },
}

/// What a substitution pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    /// Occurrences replaced per key.
    pub replaced: BTreeMap<PlaceholderKey, usize>,
    /// Keys whose answer was empty or whitespace.
    pub skipped: Vec<PlaceholderKey>,
    pub issues: Vec<FillIssue>,
}

impl FillReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Modified body plus the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    pub body: String,
    pub report: FillReport,
}

/// A named-key matching strategy: `(body, schema, key, replaced regions)`.
type Strategy = fn(&str, &DocumentSchema, &PlaceholderKey, &[(usize, usize)]) -> Vec<Match>;

/// The ordered strategy chain for named keys.
const STRATEGY_CHAIN: &[(&str, Strategy)] = &[
    ("Literal", literal_strategy),
    ("TagTolerant", tag_tolerant_strategy),
    ("NormalizedKey", normalized_key_strategy),
];

/// Replace every answered placeholder in `body`.
///
/// Unanswered placeholders are left byte-for-byte unchanged, and an empty
/// answer map returns `body` unchanged.
pub fn substitute(
    body: &str,
    schema: &DocumentSchema,
    answers: &AnswerMap,
    mode: FillMode<'_>,
) -> FillOutcome {
    let mut report = FillReport::default();
    let mut blanks: Vec<(usize, &PlaceholderKey, &str)> = Vec::new();
    let mut named: BTreeSet<&PlaceholderKey> = BTreeSet::new();

    for (key, value) in answers.iter() {
        if !schema.contains(key) {
            warn!(key = %key, "answer for unknown key ignored");
            report.issues.push(FillIssue::UnknownKey { key: key.clone() });
            continue;
        }
        if value.trim().is_empty() {
            report.skipped.push(key.clone());
            continue;
        }
        match key.blank_index() {
            Some(index) => blanks.push((index, key, value)),
            None => {
                named.insert(key);
            }
        }
    }

    if blanks.is_empty() && named.is_empty() {
        return FillOutcome {
            body: body.to_owned(),
            report,
        };
    }

    let mut working = Working::new(body);

    let expected = schema.blank_keys().len();
    let found = matchers::blank_matches(body, &[]).len();
    if !blanks.is_empty() && found != expected {
        warn!(expected, found, "blank count differs from schema, blank answers not placed");
        blanks.sort_by_key(|&(index, _, _)| index);
        report.issues.push(FillIssue::BlankCountMismatch {
            expected,
            found,
            unplaced: blanks.iter().map(|&(_, key, _)| key.clone()).collect(),
        });
        blanks.clear();
    }

    blanks.sort_by(|a, b| b.0.cmp(&a.0));
    let mut filled: BTreeSet<usize> = BTreeSet::new();
    for (index, key, value) in blanks {
        let occurrence = (0..index).filter(|j| !filled.contains(j)).count();
        if working.fill_blank(occurrence, value, mode) {
            debug!(key = %key, occurrence, "blank filled");
            filled.insert(index);
            report.replaced.insert(key.clone(), 1);
        } else {
            warn!(key = %key, occurrence, "blank occurrence not found");
            report.issues.push(FillIssue::BlankOccurrenceMissing {
                key: key.clone(),
                occurrence,
            });
        }
    }

    // Schema order keeps the pass deterministic.
    for record in schema.records.iter().filter(|r| named.contains(&r.key)) {
        let key = &record.key;
        let Some(value) = answers.answer(key) else {
            continue;
        };

        let hit = STRATEGY_CHAIN.iter().find_map(|&(name, strategy)| {
            let found = disjoint(strategy(&working.body, schema, key, &working.replaced));
            (!found.is_empty()).then_some((name, found))
        });

        match hit {
            Some((name, found)) => {
                debug!(key = %key, strategy = name, count = found.len(), "placeholder filled");
                report.replaced.insert(key.clone(), found.len());
                let rendered = render(value, mode);
                for m in found.iter().rev() {
                    working.replace(m.start, m.end, &rendered, &m.kept);
                }
            }
            None => {
                warn!(key = %key, "no surface form matched");
                report.issues.push(FillIssue::SurfaceFormNotFound { key: key.clone() });
            }
        }
    }

    FillOutcome {
        body: working.body,
        report,
    }
}

/// Signs consumed with a blank; the answer carries its own.
const CURRENCY_SIGNS: [char; 3] = ['$', '\u{20AC}', '\u{A3}'];

/// The body under edit and the spans this pass has written into it.
#[derive(Debug)]
struct Working {
    body: String,
    /// Inserted answers, as byte ranges of the current body.
    replaced: Vec<(usize, usize)>,
}

impl Working {
    fn new(body: &str) -> Self {
        Self {
            body: body.to_owned(),
            replaced: Vec::new(),
        }
    }

    /// Replace `[start, end)` with `rendered` followed by `kept`, recording
    /// `rendered` as replaced and shifting spans after the edit.
    fn replace(&mut self, start: usize, end: usize, rendered: &str, kept: &str) {
        let inserted = rendered.len() + kept.len();
        for span in &mut self.replaced {
            if span.0 >= end {
                span.0 = span.0 - (end - start) + inserted;
                span.1 = span.1 - (end - start) + inserted;
            }
        }
        let mut text = String::with_capacity(inserted);
        text.push_str(rendered);
        text.push_str(kept);
        self.body.replace_range(start..end, &text);
        self.replaced.push((start, start + rendered.len()));
    }

    /// Replace the `occurrence`-th unfilled blank. A currency sign directly
    /// before it, possibly in an earlier run, is consumed too; the tags in
    /// between are kept.
    fn fill_blank(&mut self, occurrence: usize, value: &str, mode: FillMode<'_>) -> bool {
        let Some(m) = matchers::blank_matches(&self.body, &self.replaced)
            .into_iter()
            .nth(occurrence)
        else {
            return false;
        };

        let mut start = m.start;
        let mut kept = m.kept;
        if let Some((sign_start, between)) = currency_before(&self.body, m.start) {
            if !matchers::overlaps(&self.replaced, sign_start, m.start) {
                start = sign_start;
                kept.insert_str(0, between);
            }
        }
        self.replace(start, m.end, &render(value, mode), &kept);
        true
    }
}

/// Start of a currency sign preceding `at`, skipping inline tags, and the
/// tags between the sign and `at`.
fn currency_before(body: &str, at: usize) -> Option<(usize, &str)> {
    let mut pos = at;
    while let Some(tag_start) = markup::inline_tag_ending_at(body, pos) {
        pos = tag_start;
    }
    let sign = body[..pos].chars().next_back().filter(|c| CURRENCY_SIGNS.contains(c))?;
    Some((pos - sign.len_utf8(), &body[pos..at]))
}

/// Escaped answer, optionally highlighted.
fn render(value: &str, mode: FillMode<'_>) -> String {
    let escaped = markup::escape_text(value);
    match mode {
        FillMode::Final => escaped,
        FillMode::Highlight(marker) => marker.wrap(&escaped),
    }
}

/// Sort by start and drop matches overlapping an earlier one.
fn disjoint(mut found: Vec<Match>) -> Vec<Match> {
    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut out: Vec<Match> = Vec::with_capacity(found.len());
    for m in found {
        if out.last().is_none_or(|prev| m.start >= prev.end) {
            out.push(m);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn literal_strategy(
    body: &str,
    schema: &DocumentSchema,
    key: &PlaceholderKey,
    regions: &[(usize, usize)],
) -> Vec<Match> {
    schema
        .forms(key)
        .flat_map(|form| matchers::literal_matches(body, form, regions))
        .collect()
}

fn tag_tolerant_strategy(
    body: &str,
    schema: &DocumentSchema,
    key: &PlaceholderKey,
    regions: &[(usize, usize)],
) -> Vec<Match> {
    schema
        .forms(key)
        .flat_map(|form| TagTolerantMatcher::over_tags(form).find_all(body, regions))
        .collect()
}

fn normalized_key_strategy(
    body: &str,
    _schema: &DocumentSchema,
    key: &PlaceholderKey,
    regions: &[(usize, usize)],
) -> Vec<Match> {
    matchers::normalized_key_matches(body, key.as_str(), regions)
}
