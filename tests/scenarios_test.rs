//! End-to-end extraction and substitution behavior over realistic
//! template fragments.

use docfill::{AnswerMap, FillConfig, FillIssue, FillMode, PlaceholderKey, extract, substitute};

fn schema_of(text: &str) -> docfill::DocumentSchema {
    extract(text, text, &FillConfig::default()).expect("extract")
}

fn keys(schema: &docfill::DocumentSchema) -> Vec<&str> {
    schema.records.iter().map(|r| r.key.as_str()).collect()
}

#[test]
fn test_named_placeholders_ordered_and_labelled() {
    let schema = schema_of("Agreement between [COMPANY] and [investor name].");

    assert_eq!(keys(&schema), vec!["company", "investor_name"]);
    assert_eq!(schema.records[0].position, 1);
    assert_eq!(schema.records[0].label, "Company Name");
    assert_eq!(schema.records[1].position, 2);
    assert_eq!(schema.records[1].label, "Investor Name");
    assert!(schema.records.iter().all(|r| r.value.is_none()));
}

#[test]
fn test_blank_labels_from_defined_terms() {
    let schema = schema_of(
        r#"Amount: $[____] (the "Purchase Amount"). Cap: $[____] (the "Post-Money Valuation Cap")."#,
    );

    assert_eq!(keys(&schema), vec!["blank_0", "blank_1"]);
    assert_eq!(schema.records[0].label, "Purchase Amount");
    assert_eq!(schema.records[1].label, "Post-Money Valuation Cap");
}

#[test]
fn test_blanks_answered_out_of_order_stay_in_place() {
    let body = "Amount: $[____]. Cap: $[____].";
    let schema = schema_of(body);

    let mut answers = AnswerMap::new();
    answers.insert(PlaceholderKey::blank(1), "$10,000,000");
    answers.insert(PlaceholderKey::blank(0), "$250,000");

    let out = substitute(body, &schema, &answers, FillMode::Final);
    assert_eq!(out.body, "Amount: $250,000. Cap: $10,000,000.");
    assert!(out.report.is_clean());
}

#[test]
fn test_stop_words_and_numbers_excluded() {
    let schema = schema_of("See [the] clause in Section [12], items [3-4], signed by [Title].");
    assert_eq!(keys(&schema), vec!["title"]);
}

#[test]
fn test_extraction_is_idempotent() {
    let text = r#"[Company Name] agrees to pay $[____] on [Date] (the "Effective Date"), [___]."#;
    assert_eq!(schema_of(text), schema_of(text));
}

#[test]
fn test_blank_counter_follows_document_order() {
    let text = "[___] first, [Company] between, [-----] second, [____] third";
    let schema = schema_of(text);
    let blanks = schema.blank_keys();
    assert_eq!(blanks.len(), 3);

    let positions: Vec<usize> = blanks
        .iter()
        .map(|k| schema.record(k).expect("record").position)
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(blanks[0], PlaceholderKey::blank(0));
    assert_eq!(blanks[2], PlaceholderKey::blank(2));
}

#[test]
fn test_empty_answers_leave_body_unchanged() {
    let body = "<w:p><w:t>[Company] pays $[____] &amp; [Investor Name]</w:t></w:p>";
    let schema = extract("[Company] pays $[____] & [Investor Name]", body, &FillConfig::default())
        .expect("extract");

    let out = substitute(body, &schema, &AnswerMap::new(), FillMode::Final);
    assert_eq!(out.body, body);

    let blanks_only: AnswerMap = [("company", "   ")].into_iter().collect();
    assert_eq!(substitute(body, &schema, &blanks_only, FillMode::Final).body, body);
}

#[test]
fn test_answer_does_not_touch_other_keys() {
    let body = "[Company] and [Investor Name] and [Company Name] and [___]";
    let schema = schema_of(body);
    let answers: AnswerMap = [("company", "[Investor Name]")].into_iter().collect();

    let out = substitute(body, &schema, &answers, FillMode::Final);
    assert_eq!(
        out.body,
        "[Investor Name] and [Investor Name] and [Company Name] and [___]"
    );
    assert_eq!(out.report.replaced.get(&PlaceholderKey::new("company")), Some(&1));
}

#[test]
fn test_split_placeholder_filled_across_runs() {
    let markup = "<w:p><w:r><w:t>Signed by [Investor</w:t></w:r><w:r><w:t> Name].</w:t></w:r></w:p>";
    let plain = "Signed by [Investor Name].";
    let schema = extract(plain, markup, &FillConfig::default()).expect("extract");
    let answers: AnswerMap = [("investor_name", "Jane Doe")].into_iter().collect();

    let out = substitute(markup, &schema, &answers, FillMode::Final);
    assert_eq!(
        out.body,
        "<w:p><w:r><w:t>Signed by Jane Doe</w:t></w:r><w:r><w:t>.</w:t></w:r></w:p>"
    );
    assert!(out.report.is_clean());
}

#[test]
fn test_missing_surface_form_reported_not_fatal() {
    let schema = schema_of("[Company] and [Title]");
    let answers: AnswerMap = [("title", "CEO"), ("company", "Acme")].into_iter().collect();

    let out = substitute("Only [Company] here", &schema, &answers, FillMode::Final);
    assert_eq!(out.body, "Only Acme here");
    assert_eq!(
        out.report.issues,
        vec![FillIssue::SurfaceFormNotFound {
            key: PlaceholderKey::new("title")
        }]
    );
}

#[test]
fn test_answers_are_escaped_for_markup() {
    let markup = "<w:t>[Company]</w:t>";
    let schema = extract("[Company]", markup, &FillConfig::default()).expect("extract");
    let answers: AnswerMap = [("company", "Smith & Sons <Holdings>")].into_iter().collect();

    let out = substitute(markup, &schema, &answers, FillMode::Final);
    assert_eq!(out.body, "<w:t>Smith &amp; Sons &lt;Holdings&gt;</w:t>");
}

#[test]
fn test_blank_split_across_runs_keeps_order() {
    let plain = "Amount: $[____] Cap: $[____]";
    let markup = concat!(
        "<w:p><w:r><w:t>Amount: $[</w:t></w:r><w:r><w:t>____]</w:t></w:r>",
        "<w:r><w:t> Cap: $[____]</w:t></w:r></w:p>",
    );
    let schema = extract(plain, markup, &FillConfig::default()).expect("extract");
    let answers: AnswerMap = [("blank_0", "$250,000")].into_iter().collect();

    let out = substitute(markup, &schema, &answers, FillMode::Final);
    assert_eq!(
        out.body,
        concat!(
            "<w:p><w:r><w:t>Amount: $250,000</w:t></w:r><w:r><w:t></w:t></w:r>",
            "<w:r><w:t> Cap: $[____]</w:t></w:r></w:p>",
        )
    );
    assert!(out.report.is_clean());

    let both: AnswerMap = [("blank_1", "$8,000,000"), ("blank_0", "$250,000")]
        .into_iter()
        .collect();
    let out = substitute(markup, &schema, &both, FillMode::Final);
    assert!(out.body.contains("Amount: $250,000</w:t>"));
    assert!(out.body.contains(" Cap: $8,000,000</w:t>"));
}

#[test]
fn test_currency_sign_in_separate_run() {
    let plain = "Purchase price: $[_____].";
    let markup = "<w:p><w:r><w:t>Purchase price: $</w:t></w:r><w:r><w:t>[_____].</w:t></w:r></w:p>";
    let schema = extract(plain, markup, &FillConfig::default()).expect("extract");
    let answers: AnswerMap = [("blank_0", "$1,000")].into_iter().collect();

    let out = substitute(markup, &schema, &answers, FillMode::Final);
    assert_eq!(
        out.body,
        "<w:p><w:r><w:t>Purchase price: $1,000</w:t></w:r><w:r><w:t>.</w:t></w:r></w:p>"
    );
}

#[test]
fn test_markup_with_extra_blank_is_not_filled_by_position() {
    let plain = "First [___] then [___].";
    let markup = "<w:p><w:t>Header [___]</w:t></w:p><w:p><w:t>First [___] then [___].</w:t></w:p>";
    let schema = extract(plain, markup, &FillConfig::default()).expect("extract");
    let answers: AnswerMap = [("blank_0", "one"), ("blank_1", "two")].into_iter().collect();

    let out = substitute(markup, &schema, &answers, FillMode::Final);
    assert_eq!(out.body, markup);
    assert_eq!(
        out.report.issues,
        vec![FillIssue::BlankCountMismatch {
            expected: 2,
            found: 3,
            unplaced: vec![PlaceholderKey::blank(0), PlaceholderKey::blank(1)],
        }]
    );
}

#[test]
fn test_private_use_text_untouched_by_fill() {
    let markup = "<w:t>\u{E000}sym [Company]\u{E001}</w:t>";
    let schema = extract("\u{E000}sym [Company]\u{E001}", markup, &FillConfig::default())
        .expect("extract");
    let answers: AnswerMap = [("company", "Acme")].into_iter().collect();

    let out = substitute(markup, &schema, &answers, FillMode::Final);
    assert_eq!(out.body, "<w:t>\u{E000}sym Acme\u{E001}</w:t>");
}
