//! Occurrence reconciliation for live previews.
//!
//! A preview body changes after every answer: filled values get wrapped in
//! the filled marker and the active question gets highlighted. Blank
//! positions shift with every change, so the pairing between "the Nth
//! unfilled blank in this body" and "blank key" is recomputed from scratch
//! on each render.

use serde::Serialize;
use tracing::warn;

use crate::config::Marker;
use crate::fill::matchers::{self, Match};
use crate::schema::{AnswerMap, DocumentSchema, PlaceholderKey};

/// A blank key paired with its current occurrence in a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub key: PlaceholderKey,
    /// Index among unfilled blank matches in the current body.
    pub occurrence: usize,
    pub start: usize,
    pub end: usize,
}

/// Recoverable inconsistency found while reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReconcileWarning {
    /// Unfilled blanks in the body and unanswered blank keys disagree.
    OccurrenceCountMismatch {
        unfilled_matches: usize,
        unanswered_keys: usize,
    },
}

/// Bidirectional occurrence/key mapping for one body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub pairs: Vec<Pairing>,
    /// Blank matches found inside filled markers.
    pub filled_matches: usize,
    pub warnings: Vec<ReconcileWarning>,
}

impl Reconciliation {
    /// Current span of `key`'s blank.
    pub fn span_for(&self, key: &PlaceholderKey) -> Option<(usize, usize)> {
        self.pairs
            .iter()
            .find(|p| &p.key == key)
            .map(|p| (p.start, p.end))
    }

    /// Key paired with the `occurrence`-th unfilled blank.
    pub fn key_for(&self, occurrence: usize) -> Option<&PlaceholderKey> {
        self.pairs
            .iter()
            .find(|p| p.occurrence == occurrence)
            .map(|p| &p.key)
    }

    pub fn is_consistent(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Byte ranges wrapped by `marker` in `body`.
pub fn marker_regions(body: &str, marker: &Marker) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut from = 0;
    while let Some(open) = body[from..].find(&marker.open) {
        let start = from + open;
        let inner = start + marker.open.len();
        let Some(close) = body[inner..].find(&marker.close) else {
            break;
        };
        let end = inner + close + marker.close.len();
        regions.push((start, end));
        from = end;
    }
    regions
}

/// Pair unfilled blank matches in `body` with unanswered blank keys.
///
/// The Ith unfilled match pairs with the Ith unanswered key in document
/// order. When the counts disagree the pairing still starts from the first
/// match and first key, so the earliest blank is never left unmapped, and
/// the disagreement is reported as a warning.
pub fn reconcile(
    body: &str,
    schema: &DocumentSchema,
    answers: &AnswerMap,
    filled_marker: &Marker,
) -> Reconciliation {
    let filled_regions = marker_regions(body, filled_marker);
    let (filled, unfilled): (Vec<Match>, Vec<Match>) = matchers::blank_matches(body, &[])
        .into_iter()
        .partition(|m| matchers::overlaps(&filled_regions, m.start, m.end));

    let unanswered: Vec<PlaceholderKey> = schema
        .blank_keys()
        .into_iter()
        .filter(|k| !answers.is_answered(k))
        .collect();

    let mut warnings = Vec::new();
    if unfilled.len() != unanswered.len() {
        warn!(
            unfilled_matches = unfilled.len(),
            unanswered_keys = unanswered.len(),
            "blank occurrence count mismatch"
        );
        warnings.push(ReconcileWarning::OccurrenceCountMismatch {
            unfilled_matches: unfilled.len(),
            unanswered_keys: unanswered.len(),
        });
    }

    let pairs = unfilled
        .iter()
        .zip(unanswered)
        .enumerate()
        .map(|(occurrence, (m, key))| Pairing {
            key,
            occurrence,
            start: m.start,
            end: m.end,
        })
        .collect();

    Reconciliation {
        pairs,
        filled_matches: filled.len(),
        warnings,
    }
}

/// Wrap the occurrences of `key` in `body` with `active`.
///
/// Blank keys use their reconciled span; named keys highlight every literal
/// occurrence of their surface forms outside filled markers.
pub fn highlight_active(
    body: &str,
    schema: &DocumentSchema,
    reconciliation: &Reconciliation,
    key: &PlaceholderKey,
    filled_marker: &Marker,
    active: &Marker,
) -> String {
    let spans: Vec<(usize, usize)> = if key.is_blank() {
        reconciliation.span_for(key).into_iter().collect()
    } else {
        let filled = marker_regions(body, filled_marker);
        let mut found: Vec<(usize, usize)> = schema
            .forms(key)
            .flat_map(|form| matchers::literal_matches(body, form, &filled))
            .map(|m| (m.start, m.end))
            .collect();
        found.sort_unstable();
        found.dedup_by(|b, a| b.0 < a.1);
        found
    };

    let mut out = body.to_owned();
    for &(start, end) in spans.iter().rev() {
        let wrapped = active.wrap(&out[start..end]);
        out.replace_range(start..end, &wrapped);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillConfig;
    use crate::extract::extract;
    use crate::fill::{FillMode, substitute};

    fn filled() -> Marker {
        FillConfig::default().filled_marker
    }

    #[test]
    fn test_pairs_skip_filled_blanks() {
        let plain = "A [___] B [___] C [___]";
        let schema = extract(plain, plain, &FillConfig::default()).expect("extract");
        let answers: AnswerMap = [("blank_1", "x")].into_iter().collect();
        let marker = filled();
        let body = substitute(plain, &schema, &answers, FillMode::Highlight(&marker)).body;

        let rec = reconcile(&body, &schema, &answers, &marker);
        assert!(rec.is_consistent());
        assert_eq!(rec.key_for(0), Some(&PlaceholderKey::blank(0)));
        assert_eq!(rec.key_for(1), Some(&PlaceholderKey::blank(2)));
        let (start, end) = rec.span_for(&PlaceholderKey::blank(2)).expect("span");
        assert_eq!(&body[start..end], "[___]");
        assert!(start > body.find("x").expect("filled value"));
    }

    #[test]
    fn test_blank_inside_filled_marker_is_filled() {
        let plain = "A [___] B [___]";
        let schema = extract(plain, plain, &FillConfig::default()).expect("extract");
        let answers: AnswerMap = [("blank_0", "[___]")].into_iter().collect();
        let marker = filled();
        let body = substitute(plain, &schema, &answers, FillMode::Highlight(&marker)).body;

        let rec = reconcile(&body, &schema, &answers, &marker);
        assert_eq!(rec.filled_matches, 1);
        assert_eq!(rec.pairs.len(), 1);
        assert_eq!(rec.pairs[0].key, PlaceholderKey::blank(1));
        assert!(rec.is_consistent());
    }

    #[test]
    fn test_mismatch_forces_first_pairing() {
        let plain = "A [___] B [___] C [___]";
        let schema = extract(plain, plain, &FillConfig::default()).expect("extract");
        // Body lost one blank: two unfilled matches, three unanswered keys.
        let body = "A [___] B [___] C";
        let rec = reconcile(body, &schema, &AnswerMap::new(), &filled());
        assert_eq!(
            rec.warnings,
            vec![ReconcileWarning::OccurrenceCountMismatch {
                unfilled_matches: 2,
                unanswered_keys: 3
            }]
        );
        assert_eq!(rec.key_for(0), Some(&PlaceholderKey::blank(0)));
        assert_eq!(rec.pairs.len(), 2);
    }

    #[test]
    fn test_highlight_active_blank() {
        let plain = "A [___] B [___]";
        let schema = extract(plain, plain, &FillConfig::default()).expect("extract");
        let rec = reconcile(plain, &schema, &AnswerMap::new(), &filled());
        let active = Marker::new("<mark>", "</mark>");
        let out = highlight_active(plain, &schema, &rec, &PlaceholderKey::blank(1), &filled(), &active);
        assert_eq!(out, "A [___] B <mark>[___]</mark>");
    }

    #[test]
    fn test_highlight_active_named() {
        let plain = "[Company] and [COMPANY]";
        let schema = extract(plain, plain, &FillConfig::default()).expect("extract");
        let rec = reconcile(plain, &schema, &AnswerMap::new(), &filled());
        let active = Marker::new("<mark>", "</mark>");
        let out = highlight_active(plain, &schema, &rec, &"company".into(), &filled(), &active);
        assert_eq!(out, "<mark>[Company]</mark> and <mark>[COMPANY]</mark>");
    }

    #[test]
    fn test_marker_regions() {
        let marker = Marker::new("<b>", "</b>");
        assert_eq!(marker_regions("x<b>1</b>y<b>2</b>", &marker), vec![(1, 9), (10, 18)]);
        assert_eq!(marker_regions("<b>open", &marker), Vec::new());
    }
}
