//! Key normalization and candidate rejection.

use crate::schema::PlaceholderKey;

/// Articles, prepositions, and conjunctions that are never field names.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "if", "in", "into", "is", "it",
    "nor", "of", "on", "or", "so", "the", "to", "upon", "with", "yet",
];

/// Minimum normalized key length.
const MIN_KEY_LEN: usize = 2;

/// Why a named candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooShort,
    Numeric,
    StopWord,
}

/// Normalize raw bracket content into a key: whitespace runs and hyphens
/// become single underscores, letters are lowercased.
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let ch = if ch.is_whitespace() || ch == '-' { '_' } else { ch };
        if ch == '_' && key.ends_with('_') {
            continue;
        }
        key.extend(ch.to_lowercase());
    }
    key
}

/// Normalize `raw` and apply the rejection rules.
///
/// `extra_stop_words` extends the built-in set and is compared against the
/// normalized key.
pub fn named_key(raw: &str, extra_stop_words: &[String]) -> Result<PlaceholderKey, Rejection> {
    let key = normalize_key(raw);
    // Section and footnote references: `[12]`, `[3-4]`, `[2 1]`.
    if key.contains(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_digit() || c == '_')
    {
        return Err(Rejection::Numeric);
    }
    if key.chars().count() < MIN_KEY_LEN {
        return Err(Rejection::TooShort);
    }
    if STOP_WORDS.contains(&key.as_str()) || extra_stop_words.iter().any(|w| w == &key) {
        return Err(Rejection::StopWord);
    }
    Ok(PlaceholderKey::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_key("Company Name"), "company_name");
        assert_eq!(normalize_key("COMPANY"), "company");
        assert_eq!(normalize_key("post-money  valuation"), "post_money_valuation");
        assert_eq!(normalize_key("investor - name"), "investor_name");
    }

    #[test]
    fn test_variants_share_key() {
        let a = named_key("Company Name", &[]).expect("key");
        let b = named_key("company  name", &[]).expect("key");
        let c = named_key("COMPANY-NAME", &[]).expect("key");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(named_key("the", &[]), Err(Rejection::StopWord));
        assert_eq!(named_key("THE", &[]), Err(Rejection::StopWord));
        assert_eq!(named_key("12", &[]), Err(Rejection::Numeric));
        assert_eq!(named_key("7", &[]), Err(Rejection::Numeric));
        assert_eq!(named_key("3-4", &[]), Err(Rejection::Numeric));
        assert!(named_key("2024 Amendment", &[]).is_ok());
        assert_eq!(named_key("x", &[]), Err(Rejection::TooShort));
        assert_eq!(named_key("__", &[]), Err(Rejection::TooShort));
    }

    #[test]
    fn test_extra_stop_words() {
        let extra = vec!["hereof".to_owned()];
        assert_eq!(named_key("Hereof", &extra), Err(Rejection::StopWord));
        assert!(named_key("Hereof", &[]).is_ok());
    }
}
