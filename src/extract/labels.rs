//! Human labels for named keys.
//!
//! Lookup order: exact dictionary entry, then a recognized party prefix
//! (`company_`, `investor_`) joined to a known suffix, then title case.

/// Exact normalized key to label.
const KNOWN_LABELS: &[(&str, &str)] = &[
    ("company", "Company Name"),
    ("company_name", "Company Name"),
    ("investor", "Investor Name"),
    ("investor_name", "Investor Name"),
    ("name", "Name"),
    ("title", "Title"),
    ("signature", "Signature"),
    ("signature_line", "Signature"),
    ("address", "Address"),
    ("email", "Email"),
    ("email_address", "Email"),
    ("date", "Date"),
    ("state", "State"),
    ("state_of_incorporation", "State of Incorporation"),
    ("governing_law_jurisdiction", "Governing Law Jurisdiction"),
    ("purchase_amount", "Purchase Amount"),
    ("valuation_cap", "Valuation Cap"),
    ("discount_rate", "Discount Rate"),
];

/// Party prefixes that combine with [`PARTY_SUFFIXES`].
const PARTY_PREFIXES: &[(&str, &str)] = &[("company_", "Company"), ("investor_", "Investor")];

const PARTY_SUFFIXES: &[(&str, &str)] = &[
    ("name", "Name"),
    ("title", "Title"),
    ("signature", "Signature"),
    ("signatory", "Signatory"),
    ("address", "Address"),
    ("email", "Email"),
    ("email_address", "Email"),
    ("representative", "Representative"),
    ("phone", "Phone"),
];

/// Words rendered fully uppercase in title-cased labels.
const ABBREVIATIONS: &[&str] = &[
    "safe", "llc", "lp", "llp", "inc", "ein", "ssn", "id", "us", "usa", "ceo", "cfo", "coo", "cto",
    "vp", "ip",
];

/// Words kept lowercase inside a title-cased label.
const MINOR_WORDS: &[&str] = &["a", "an", "and", "as", "at", "by", "for", "in", "of", "on", "or", "the", "to"];

/// Label for a named key.
pub fn label_for_key(key: &str, extra_abbreviations: &[String]) -> String {
    if let Some((_, label)) = KNOWN_LABELS.iter().find(|(k, _)| *k == key) {
        return (*label).to_owned();
    }

    for (prefix, party) in PARTY_PREFIXES {
        let Some(suffix) = key.strip_prefix(prefix) else {
            continue;
        };
        if let Some((_, label)) = PARTY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
            return format!("{party} {label}");
        }
    }

    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            if ABBREVIATIONS.contains(&word) || extra_abbreviations.iter().any(|a| a == word) {
                word.to_uppercase()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Title-case free text (a quoted defined term), keeping minor words
/// lowercase except at the start and capitalizing after hyphens.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i > 0 && MINOR_WORDS.contains(&word.to_lowercase().as_str()) {
                word.to_lowercase()
            } else {
                word.split('-').map(capitalize).collect::<Vec<_>>().join("-")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
