//! Blank disambiguation.
//!
//! A blank like `[_____]` has no name of its own, so its label is inferred
//! from the text around it. Rules are pure functions evaluated in priority
//! order; the first one that returns a label wins. Money and dates come first
//! because they are the most common blank types in financing documents.

use std::sync::LazyLock;

use regex::Regex;

use super::labels::title_case;

/// Characters on each side of the blank that count as "nearby".
const NEAR_CHARS: usize = 60;

/// `(the "Defined Term")` directly after the blank.
static ADJACENT_DEFINED_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*\(\s*(?:the\s+)?["\u{201C}]([^"\u{201C}\u{201D}]{1,80})["\u{201D}]"#)
        .expect("valid adjacent defined term regex")
});

/// Any quoted term.
static QUOTED_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["\u{201C}]([^"\u{201C}\u{201D}]{2,80})["\u{201D}]"#)
        .expect("valid quoted term regex")
});

/// `..., a [____] corporation`: the article right before the blank.
static ARTICLE_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\ban?\s*$").expect("valid article regex"));

static CORPORATION_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*corporation\b").expect("valid corporation regex"));

/// Text surrounding one blank occurrence.
#[derive(Debug, Clone)]
pub struct BlankContext<'a> {
    /// Text before the blank, nearest character last.
    pub before: &'a str,
    /// Text after the blank, nearest character first.
    pub after: &'a str,
}

impl BlankContext<'_> {
    fn near_before(&self) -> &str {
        tail_chars(self.before, NEAR_CHARS)
    }

    fn near_after(&self) -> &str {
        head_chars(self.after, NEAR_CHARS)
    }

    /// Lowercased nearby text on both sides.
    fn near(&self) -> String {
        format!("{} {}", self.near_before(), self.near_after()).to_lowercase()
    }

    /// Lowercased full captured context on both sides.
    fn full(&self) -> String {
        format!("{} {}", self.before, self.after).to_lowercase()
    }

    fn preceded_by_currency(&self) -> bool {
        self.before.ends_with(['$', '\u{20AC}', '\u{A3}'])
    }
}

/// A label inference rule.
type BlankRule = fn(&BlankContext<'_>) -> Option<String>;

/// The ordered rule cascade.
const BLANK_RULES: &[(&str, BlankRule)] = &[
    ("CurrencyDefinedTerm", currency_defined_term),
    ("CurrencyKeyword", currency_keyword),
    ("DateKeyword", date_keyword),
    ("Incorporation", incorporation),
    ("GoverningLaw", governing_law),
    ("TrailingDefinedTerm", trailing_defined_term),
    ("ContextKeyword", context_keyword),
];

/// Infer a label for the blank at 0-based blank `index`.
///
/// `before` and `after` are the (already bounded) context windows. Falls back
/// to `Field <n>` with `n` the blank index, matching the `blank_<n>` key.
pub fn label_for_blank(index: usize, before: &str, after: &str) -> String {
    let ctx = BlankContext { before, after };
    for &(name, rule) in BLANK_RULES {
        if let Some(label) = rule(&ctx) {
            tracing::trace!(rule = name, index, label = %label, "blank labelled");
            return label;
        }
    }
    format!("Field {index}")
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// `$[____] (the "Purchase Amount")`
fn currency_defined_term(ctx: &BlankContext<'_>) -> Option<String> {
    if !ctx.preceded_by_currency() {
        return None;
    }
    let caps = ADJACENT_DEFINED_TERM.captures(ctx.after)?;
    Some(title_case(caps.get(1)?.as_str()))
}

/// `$[____]` with no defined term: classify by nearby keywords.
fn currency_keyword(ctx: &BlankContext<'_>) -> Option<String> {
    if !ctx.preceded_by_currency() {
        return None;
    }
    let near = ctx.near();
    let before = ctx.near_before().to_lowercase();
    Some(financial_label(&near, &before).unwrap_or("Amount").to_owned())
}

fn date_keyword(ctx: &BlankContext<'_>) -> Option<String> {
    date_label(&ctx.near()).map(str::to_owned)
}

fn incorporation(ctx: &BlankContext<'_>) -> Option<String> {
    let framed = ARTICLE_BEFORE.is_match(ctx.before) && CORPORATION_AFTER.is_match(ctx.after);
    (framed || ctx.near().contains("state of incorporation"))
        .then(|| "State of Incorporation".to_owned())
}

fn governing_law(ctx: &BlankContext<'_>) -> Option<String> {
    let near = ctx.near();
    (near.contains("governing law") || near.contains("laws of the state of"))
        .then(|| "Governing Law Jurisdiction".to_owned())
}

fn trailing_defined_term(ctx: &BlankContext<'_>) -> Option<String> {
    let caps = QUOTED_TERM.captures(ctx.after)?;
    Some(title_case(caps.get(1)?.as_str().trim()))
}

fn context_keyword(ctx: &BlankContext<'_>) -> Option<String> {
    let full = ctx.full();
    financial_label(&full, &ctx.before.to_lowercase())
        .or_else(|| date_label(&full))
        .map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Keyword classifiers
// ---------------------------------------------------------------------------

/// Money labels by keyword priority. `before` is searched for the phrases
/// that introduce a payment.
fn financial_label(text: &str, before: &str) -> Option<&'static str> {
    let has_cap = text.contains("valuation cap");
    if has_cap && text.contains("post-money") {
        return Some("Post-Money Valuation Cap");
    }
    if text.contains("purchase amount")
        || before.contains("payment by")
        || before.contains("exchange for")
    {
        return Some("Purchase Amount");
    }
    if has_cap {
        return Some("Valuation Cap");
    }
    if text.contains("discount") {
        return Some("Discount Rate");
    }
    None
}

fn date_label(text: &str) -> Option<&'static str> {
    if text.contains("on or about") || text.contains("date of safe") {
        return Some("Date of Safe");
    }
    if text.contains("effective date") {
        return Some("Effective Date");
    }
    if contains_word(text, "date") {
        return Some("Date");
    }
    None
}

/// `needle` occurs in `haystack` with no alphanumeric neighbour.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, m)| {
        let before_ok = haystack[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[i + m.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Last `n` characters of `s`.
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let start = s.char_indices().rev().nth(n - 1).map_or(0, |(i, _)| i);
    &s[start..]
}

/// First `n` characters of `s`.
pub fn head_chars(s: &str, n: usize) -> &str {
    let end = s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    &s[..end]
}
