//! Placeholder matchers used by the substitution engine.
//!
//! Every matcher returns [`Match`]es against the *current* body and skips
//! anything overlapping a replaced span, so an answer that happens to
//! contain placeholder-like text is never substituted again.

use regex::Regex;

use crate::extract::scan::{MAX_INNER_BYTES, MIN_BLANK_RUN};
use crate::markup;

/// One located occurrence in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Byte offset where the occurrence starts.
    pub start: usize,
    /// Byte offset one past the occurrence.
    pub end: usize,
    /// Markup inside the occurrence that must survive replacement.
    pub kept: String,
}

impl Match {
    const fn plain(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kept: String::new(),
        }
    }
}

/// Whether `[start, end)` overlaps any of `regions`.
pub fn overlaps(regions: &[(usize, usize)], start: usize, end: usize) -> bool {
    regions.iter().any(|&(rs, re)| start < re && rs < end)
}

/// Whether byte `at` lies inside any of `regions`.
pub fn inside(regions: &[(usize, usize)], at: usize) -> bool {
    regions.iter().any(|&(rs, re)| rs <= at && at < re)
}

/// Find `needle` in `haystack` at or after `from`, ignoring ASCII case.
pub fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() || hay.len() < pat.len() {
        return None;
    }
    (from..=hay.len() - pat.len()).find(|&i| {
        hay[i..i + pat.len()].eq_ignore_ascii_case(pat)
            && haystack.is_char_boundary(i)
            && haystack.is_char_boundary(i + pat.len())
    })
}

// ---------------------------------------------------------------------------
// Strategy 1: literal
// ---------------------------------------------------------------------------

/// All non-overlapping case-insensitive occurrences of `form`.
pub fn literal_matches(body: &str, form: &str, regions: &[(usize, usize)]) -> Vec<Match> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(start) = find_ascii_ci(body, form, from) {
        let end = start + form.len();
        if !overlaps(regions, start, end) {
            found.push(Match::plain(start, end));
        }
        from = end;
    }
    found
}

// ---------------------------------------------------------------------------
// Strategy 2: tag-tolerant literal
// ---------------------------------------------------------------------------

/// Returns the byte length of a skippable span at an offset.
pub type SkipPredicate = fn(&str, usize) -> Option<usize>;

/// Matches a literal whose characters may be interleaved with skippable
/// spans (markup tags), as happens when a renderer splits one placeholder
/// across several text runs.
///
/// Skippable spans are only consumed *between* characters of the target,
/// never before the first or after the last. They are reported in
/// [`Match::kept`] so the replacement can put them back.
#[derive(Debug, Clone)]
pub struct TagTolerantMatcher {
    target: Vec<char>,
    skip: SkipPredicate,
}

impl TagTolerantMatcher {
    pub fn new(target: &str, skip: SkipPredicate) -> Self {
        Self {
            target: target.chars().collect(),
            skip,
        }
    }

    /// Matcher that steps over markup tags.
    pub fn over_tags(target: &str) -> Self {
        Self::new(target, markup::tag_len_at)
    }

    /// All non-overlapping matches in `body`, outside replaced regions.
    pub fn find_all(&self, body: &str, regions: &[(usize, usize)]) -> Vec<Match> {
        let mut found = Vec::new();
        let Some(&first) = self.target.first() else {
            return found;
        };

        let mut from = 0;
        while from < body.len() {
            let Some(offset) = body[from..].find(|c: char| c.eq_ignore_ascii_case(&first)) else {
                break;
            };
            let start = from + offset;
            match self.match_at(body, start) {
                Some(m) if !overlaps(regions, m.start, m.end) => {
                    from = m.end;
                    found.push(m);
                }
                _ => from = start + first.len_utf8(),
            }
        }
        found
    }

    fn match_at(&self, body: &str, start: usize) -> Option<Match> {
        let mut pos = start;
        let mut kept = String::new();

        for (j, &expected) in self.target.iter().enumerate() {
            if j > 0 {
                while let Some(len) = (self.skip)(body, pos) {
                    kept.push_str(&body[pos..pos + len]);
                    pos += len;
                }
            }
            let actual = body[pos..].chars().next()?;
            if !actual.eq_ignore_ascii_case(&expected) {
                return None;
            }
            pos += actual.len_utf8();
        }

        Some(Match {
            start,
            end: pos,
            kept,
        })
    }
}

// ---------------------------------------------------------------------------
// Strategy 3: normalized key pattern
// ---------------------------------------------------------------------------

/// Regex matching `[word word]`, `{word_word}`, `[WORD-WORD]` and similar
/// spellings of a normalized key.
pub fn normalized_key_pattern(key: &str) -> Option<Regex> {
    let words: Vec<String> = key
        .split('_')
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)[\[\{{]\s*{}\s*[\]\}}]", words.join(r"[\s_\-]+"));
    Regex::new(&pattern).ok()
}

/// All matches of the normalized key pattern outside replaced regions.
pub fn normalized_key_matches(body: &str, key: &str, regions: &[(usize, usize)]) -> Vec<Match> {
    let Some(re) = normalized_key_pattern(key) else {
        return Vec::new();
    };
    re.find_iter(body)
        .filter(|m| !overlaps(regions, m.start(), m.end()))
        .map(|m| Match::plain(m.start(), m.end()))
        .collect()
}

// ---------------------------------------------------------------------------
// Blanks
// ---------------------------------------------------------------------------

/// Matches bracket blanks (`[`, a run of `_`/`-`, `]`) whose characters
/// may be interleaved with skippable spans, the way Word splits `$[____]`
/// across runs when part of it was edited separately.
///
/// Follows the same shape rules as the plain-text scanner, so a body and
/// its plain rendition agree on how many blanks there are.
#[derive(Debug, Clone, Copy)]
pub struct BlankMatcher {
    skip: SkipPredicate,
}

impl BlankMatcher {
    pub const fn new(skip: SkipPredicate) -> Self {
        Self { skip }
    }

    /// Matcher that steps over inline tags but not paragraph boundaries.
    pub const fn over_tags() -> Self {
        Self::new(markup::inline_tag_len_at)
    }

    /// All blanks in `body`, in document order, outside `regions`.
    pub fn find_all(&self, body: &str, regions: &[(usize, usize)]) -> Vec<Match> {
        let mut found = Vec::new();
        let mut from = 0;
        while let Some(offset) = body[from..].find('[') {
            let start = from + offset;
            match self.match_at(body, start) {
                Some(m) if !overlaps(regions, m.start, m.end) => {
                    from = m.end;
                    found.push(m);
                }
                _ => from = start + 1,
            }
        }
        found
    }

    fn match_at(&self, body: &str, start: usize) -> Option<Match> {
        let bytes = body.as_bytes();
        let mut pos = start + 1;
        let mut kept = String::new();
        let mut run = 0usize;

        loop {
            while let Some(len) = (self.skip)(body, pos) {
                kept.push_str(&body[pos..pos + len]);
                pos += len;
            }
            match *bytes.get(pos)? {
                b'_' | b'-' if run < MAX_INNER_BYTES => {
                    run += 1;
                    pos += 1;
                }
                b']' if run >= MIN_BLANK_RUN => {
                    return Some(Match {
                        start,
                        end: pos + 1,
                        kept,
                    });
                }
                _ => return None,
            }
        }
    }
}

/// Bracket-blank occurrences in document order, outside `regions`.
pub fn blank_matches(body: &str, regions: &[(usize, usize)]) -> Vec<Match> {
    BlankMatcher::over_tags().find_all(body, regions)
}
