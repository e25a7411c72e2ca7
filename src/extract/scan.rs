//! Two-phase placeholder scanner.
//!
//! Phase one tokenizes every `[...]` span that opens and closes on the same
//! line without a nested `[`. Phase two classifies each span's inner text as
//! a blank, a named placeholder, or nothing. The scanner only checks shape;
//! content rules (stop words, numerics, length) belong to
//! [`super::normalize`]. It is stateless between calls, so scanning the same
//! text twice always yields the same spans.

/// Longest inner text considered a placeholder, in bytes.
pub(crate) const MAX_INNER_BYTES: usize = 200;

/// Minimum run of underscores/hyphens that forms a blank.
pub(crate) const MIN_BLANK_RUN: usize = 3;

/// Classification of a bracketed span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// `[Company Name]`: carries its own identity.
    Named,
    /// `[_____]`: identified only by position.
    Blank,
}

/// One bracketed placeholder occurrence in a scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Byte offset of the opening `[`.
    pub start: usize,
    /// Byte offset one past the closing `]`.
    pub end: usize,
    /// Full literal text including brackets.
    pub surface: &'a str,
    /// Text between the brackets.
    pub inner: &'a str,
    pub kind: CandidateKind,
}

/// Phase one: byte ranges of every single-line, non-nested `[...]` span.
fn bracket_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;

    for (i, b) in text.bytes().enumerate() {
        match b {
            b'[' => open = Some(i),
            b']' => {
                if let Some(start) = open.take() {
                    if i - start - 1 <= MAX_INNER_BYTES {
                        spans.push((start, i + 1));
                    }
                }
            }
            b'\n' | b'\r' => open = None,
            _ => {}
        }
    }

    spans
}

/// Phase two: classify the text between brackets.
///
/// A run of underscores/hyphens is checked first, since it would otherwise
/// also satisfy the identifier shape (it starts with `_`).
pub fn classify(inner: &str) -> Option<CandidateKind> {
    if is_blank_run(inner) {
        return Some(CandidateKind::Blank);
    }
    if is_identifier(inner) {
        return Some(CandidateKind::Named);
    }
    None
}

fn is_blank_run(inner: &str) -> bool {
    inner.len() >= MIN_BLANK_RUN && inner.bytes().all(|b| b == b'_' || b == b'-')
}

fn is_identifier(inner: &str) -> bool {
    let mut chars = inner.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphanumeric() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
}

/// Scan `text` for every placeholder candidate, in document order.
pub fn scan(text: &str) -> Vec<Candidate<'_>> {
    bracket_spans(text)
        .into_iter()
        .filter_map(|(start, end)| {
            let inner = &text[start + 1..end - 1];
            classify(inner).map(|kind| Candidate {
                start,
                end,
                surface: &text[start..end],
                inner,
                kind,
            })
        })
        .collect()
}

/// Scan `text` for blank candidates only, in document order.
pub fn scan_blanks(text: &str) -> Vec<Candidate<'_>> {
    scan(text)
        .into_iter()
        .filter(|c| c.kind == CandidateKind::Blank)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_and_blank() {
        let text = "Between [Company Name] and [____] on [DATE].";
        let found = scan(text);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].surface, "[Company Name]");
        assert_eq!(found[0].kind, CandidateKind::Named);
        assert_eq!(found[1].inner, "____");
        assert_eq!(found[1].kind, CandidateKind::Blank);
        assert_eq!(&text[found[2].start..found[2].end], "[DATE]");
    }

    #[test]
    fn test_hyphen_blank_and_short_runs() {
        assert_eq!(classify("---"), Some(CandidateKind::Blank));
        assert_eq!(classify("_-_-"), Some(CandidateKind::Blank));
        assert_eq!(classify("__"), Some(CandidateKind::Named));
        assert_eq!(classify("-"), None);
    }

    #[test]
    fn test_digits_left_to_normalizer() {
        assert_eq!(classify("12"), Some(CandidateKind::Named));
        assert_eq!(classify("2024 Amendment"), Some(CandidateKind::Named));
    }

    #[test]
    fn test_rejects_non_identifiers() {
        assert_eq!(classify(" Company"), None);
        assert_eq!(classify("Company, Inc."), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("Company</w:t><w:t>Name"), None);
    }

    #[test]
    fn test_nested_open_bracket_restarts() {
        let found = scan("[[Investor]]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].surface, "[Investor]");
    }

    #[test]
    fn test_span_does_not_cross_lines() {
        assert!(scan("[Company\nName]").is_empty());
    }

    #[test]
    fn test_scan_blanks_only() {
        let blanks = scan_blanks("[A] [___] [B] [-----]");
        assert_eq!(blanks.len(), 2);
        assert_eq!(blanks[1].surface, "[-----]");
    }

    #[test]
    fn test_rescan_is_stable() {
        let text = "$[____] and [Title] and [____]";
        assert_eq!(scan(text), scan(text));
    }
}
