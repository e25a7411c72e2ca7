//! Diff between an original body and its filled result, using `similar`.
//!
//! Document markup is usually one enormous line, so bodies are split after
//! each paragraph close before diffing.

use similar::{Algorithm, TextDiff};

const PARAGRAPH_CLOSES: &[&str] = &["</w:p>", "</p>"];

/// Break `body` into one line per paragraph. Existing newlines are kept.
pub fn paragraph_lines(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + body.len() / 64);
    let mut rest = body;
    while let Some((at, close)) = PARAGRAPH_CLOSES
        .iter()
        .filter_map(|close| rest.find(close).map(|at| (at, *close)))
        .min_by_key(|&(at, _)| at)
    {
        let end = at + close.len();
        out.push_str(&rest[..end]);
        if !rest[end..].starts_with('\n') {
            out.push('\n');
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Unified diff of `old` against `new`, split per paragraph.
///
/// Patience keeps unchanged paragraphs anchored, which reads better than
/// Myers on long documents with few edits.
pub fn unified_diff(file_name: &str, old: &str, new: &str) -> String {
    let old = paragraph_lines(old);
    let new = paragraph_lines(new);
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(&old, &new);

    diff.unified_diff()
        .header(&format!("a/{file_name}"), &format!("b/{file_name}"))
        .to_string()
}
