//! Markup primitives shared by extraction, substitution, and preview.
//!
//! The core never parses a full XML tree. It only needs to recognize where a
//! tag starts and ends so matchers can step over tags, and to escape answer
//! text before it lands between tags.

use crate::error::{FillError, FillResult};

/// Byte length of the tag starting at `at`, if `body[at..]` opens a tag.
///
/// A tag is `<` followed by a name start (`A-Z`, `a-z`, `/`, `!`, `?`) and
/// runs to the next `>`. A `<` in text position is always escaped in
/// well-formed markup, so anything else is not a tag.
pub fn tag_len_at(body: &str, at: usize) -> Option<usize> {
    let bytes = body.as_bytes();
    if bytes.get(at) != Some(&b'<') {
        return None;
    }
    let next = *bytes.get(at + 1)?;
    if !(next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?')) {
        return None;
    }
    let close = body[at + 1..].find(['>', '<'])?;
    if bytes[at + 1 + close] == b'<' {
        return None;
    }
    Some(close + 2)
}

/// Check that `markup` can be walked as text interleaved with tags.
///
/// # Errors
///
/// Returns [`FillError::Decode`] for NUL bytes or a tag that is never closed.
pub fn validate(markup: &str) -> FillResult<()> {
    if let Some(offset) = markup.find('\0') {
        return Err(FillError::Decode {
            offset,
            reason: "NUL byte in document body".to_owned(),
        });
    }

    let bytes = markup.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let opens_tag = bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'));
        if !opens_tag {
            i += 1;
            continue;
        }
        match tag_len_at(markup, i) {
            Some(len) => i += len,
            None => {
                return Err(FillError::Decode {
                    offset: i,
                    reason: "unterminated tag".to_owned(),
                });
            }
        }
    }
    Ok(())
}

/// Name of the tag spanning `tag` (e.g. `w:p` for `</w:p>`), and whether it
/// is a closing tag.
fn tag_name(tag: &str) -> (&str, bool) {
    let inner = tag.trim_start_matches('<');
    let (inner, closing) = match inner.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    (&inner[..end], closing)
}

/// The character a tag stands for in the plain-text rendition, if any.
fn text_break(tag: &str) -> Option<char> {
    match tag_name(tag) {
        ("w:p" | "p" | "div" | "li" | "tr", true) | ("br" | "w:br" | "w:cr", false) => Some('\n'),
        ("w:tab", false) => Some('\t'),
        _ => None,
    }
}

/// Like [`tag_len_at`], but only for tags that leave no trace in the plain
/// text (run and text boundaries, formatting). Paragraph ends, breaks, and
/// tabs are not skippable.
pub fn inline_tag_len_at(body: &str, at: usize) -> Option<usize> {
    let len = tag_len_at(body, at)?;
    text_break(&body[at..at + len]).is_none().then_some(len)
}

/// Start of the inline tag that ends exactly at byte `end`.
pub fn inline_tag_ending_at(body: &str, end: usize) -> Option<usize> {
    let head = body.get(..end)?;
    if !head.ends_with('>') {
        return None;
    }
    let start = head.rfind('<')?;
    (inline_tag_len_at(body, start) == Some(end - start)).then_some(start)
}

/// Derive a plain-text rendition from a markup body.
///
/// Tags are dropped, paragraph ends and breaks become newlines, tabs become
/// `\t`, and the predefined and numeric character entities are decoded.
pub fn plain_text(markup: &str) -> FillResult<String> {
    validate(markup)?;

    let mut out = String::with_capacity(markup.len() / 2);
    let mut i = 0;
    while i < markup.len() {
        if let Some(len) = tag_len_at(markup, i) {
            if let Some(ch) = text_break(&markup[i..i + len]) {
                out.push(ch);
            }
            i += len;
            continue;
        }
        if markup.as_bytes()[i] == b'&' {
            if let Some((decoded, len)) = decode_entity(&markup[i..]) {
                out.push(decoded);
                i += len;
                continue;
            }
        }
        let ch = markup[i..].chars().next().unwrap_or('\u{FFFD}');
        out.push(ch);
        i += ch.len_utf8();
    }
    Ok(out)
}

/// Decode one entity at the start of `s`, returning the character and the
/// number of bytes consumed.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let end = s.bytes().take(12).position(|b| b == b';')?;
    let name = &s[1..end];
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, end + 1))
}

/// Escape answer text for insertion between tags.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
