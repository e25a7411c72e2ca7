//! Fill session controller.
//!
//! A [`FillSession`] owns everything about one loaded template: both
//! renditions, the schema, and the answers. Loading another template means
//! building a new session; nothing is shared between sessions.

use std::sync::{Arc, mpsc};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::FillConfig;
use crate::error::{FillError, FillResult};
use crate::extract::extract;
use crate::fill::{FillMode, FillOutcome, FillReport, substitute};
use crate::markup;
use crate::reconcile::{self, Reconciliation};
use crate::schema::{AnswerMap, DocumentSchema, PlaceholderKey, PlaceholderRecord};

// ---------------------------------------------------------------------------
// Question phrasing
// ---------------------------------------------------------------------------

/// Turns a placeholder record into the question shown to the user.
pub trait QuestionPhraser: Send + Sync {
    fn phrase(&self, record: &PlaceholderRecord) -> anyhow::Result<String>;
}

/// Deterministic phrasing from the record's label.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePhraser;

impl TemplatePhraser {
    pub fn question(record: &PlaceholderRecord) -> String {
        let label = record.label.as_str();
        let lower = label.to_lowercase();
        if lower.contains("signature") {
            format!("Please type the name to appear on the {label} line.")
        } else if lower.contains("email") {
            format!("What is the {label} address?")
        } else if lower.contains("date") {
            format!("What is the {label}? (e.g. January 1, 2025)")
        } else if lower.contains("amount") || lower.contains("cap") {
            format!("What is the {label}? Include the currency symbol (e.g. $100,000).")
        } else {
            format!("What is the {label}?")
        }
    }
}

impl QuestionPhraser for TemplatePhraser {
    fn phrase(&self, record: &PlaceholderRecord) -> anyhow::Result<String> {
        Ok(Self::question(record))
    }
}

/// Runs an external phraser with a deadline; on timeout or error the
/// template question is used instead.
pub struct TimedPhraser {
    inner: Arc<dyn QuestionPhraser>,
    timeout: Duration,
}

impl TimedPhraser {
    pub fn new(inner: Arc<dyn QuestionPhraser>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl QuestionPhraser for TimedPhraser {
    fn phrase(&self, record: &PlaceholderRecord) -> anyhow::Result<String> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = record.clone();
        std::thread::spawn(move || {
            // The receiver may be gone after a timeout.
            let _ = tx.send(inner.phrase(&owned));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(question)) if !question.trim().is_empty() => Ok(question),
            Ok(Ok(_)) => {
                debug!(key = %record.key, "phraser returned empty question, using template");
                Ok(TemplatePhraser::question(record))
            }
            Ok(Err(e)) => {
                warn!(key = %record.key, error = %e, "phraser failed, using template");
                Ok(TemplatePhraser::question(record))
            }
            Err(_) => {
                warn!(
                    key = %record.key,
                    timeout_ms = self.timeout.as_millis(),
                    "phraser timed out, using template"
                );
                Ok(TemplatePhraser::question(record))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The next question to ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub key: PlaceholderKey,
    pub label: String,
    pub position: usize,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

/// A preview rendering with the active question highlighted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub body: String,
    pub active: Option<PlaceholderKey>,
    pub reconciliation: Reconciliation,
    pub report: FillReport,
}

/// One template being filled.
pub struct FillSession {
    markup: String,
    config: FillConfig,
    schema: DocumentSchema,
    answers: AnswerMap,
    phraser: Box<dyn QuestionPhraser>,
}

impl std::fmt::Debug for FillSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillSession")
            .field("keys", &self.schema.len())
            .field("answers", &self.answers.len())
            .finish_non_exhaustive()
    }
}

impl FillSession {
    /// Extract the schema from both renditions and start a session.
    pub fn new(plain: &str, markup: &str, config: FillConfig) -> FillResult<Self> {
        config.validate()?;
        let schema = extract(plain, markup, &config)?;
        debug!(keys = schema.len(), "fill session started");
        Ok(Self {
            markup: markup.to_owned(),
            config,
            schema,
            answers: AnswerMap::new(),
            phraser: Box::new(TemplatePhraser),
        })
    }

    /// Start a session from markup alone, deriving the plain text from it.
    pub fn from_markup(markup: &str, config: FillConfig) -> FillResult<Self> {
        let plain = markup::plain_text(markup)?;
        Self::new(&plain, markup, config)
    }

    /// Use `phraser` for questions, bounded by the configured timeout.
    #[must_use]
    pub fn with_phraser(mut self, phraser: Arc<dyn QuestionPhraser>) -> Self {
        let timeout = Duration::from_millis(self.config.phrasing_timeout_ms);
        self.phraser = Box::new(TimedPhraser::new(phraser, timeout));
        self
    }

    pub const fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    pub const fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub const fn config(&self) -> &FillConfig {
        &self.config
    }

    /// The markup rendition the session was loaded from.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Record one answer.
    ///
    /// Returns `Ok(false)` for an empty or whitespace-only value, which
    /// leaves the key unanswered. Answering a key again replaces its value.
    pub fn answer(&mut self, key: &str, value: &str) -> FillResult<bool> {
        let key = PlaceholderKey::new(key);
        let Some(record) = self.schema.record_mut(&key) else {
            return Err(FillError::UnknownKey {
                key: key.to_string(),
            });
        };
        if value.trim().is_empty() {
            debug!(key = %key, "empty answer treated as unanswered");
            return Ok(false);
        }
        record.value = Some(value.to_owned());
        if self.answers.insert(key.clone(), value).is_some() {
            debug!(key = %key, "answer replaced");
        }
        Ok(true)
    }

    /// Record a batch of answers. Every key is checked before any is stored.
    pub fn answer_all<'a>(
        &mut self,
        batch: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> FillResult<usize> {
        let batch: Vec<(&str, &str)> = batch.into_iter().collect();
        if let Some((key, _)) = batch
            .iter()
            .find(|(key, _)| !self.schema.contains(&PlaceholderKey::new(*key)))
        {
            return Err(FillError::UnknownKey {
                key: (*key).to_owned(),
            });
        }
        let mut stored = 0;
        for (key, value) in batch {
            if self.answer(key, value)? {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// First record in document order without an answer, phrased.
    pub fn next_question(&self) -> Option<Question> {
        let record = self
            .schema
            .records
            .iter()
            .find(|r| !self.answers.is_answered(&r.key))?;
        let prompt = self
            .phraser
            .phrase(record)
            .unwrap_or_else(|_| TemplatePhraser::question(record));
        Some(Question {
            key: record.key.clone(),
            label: record.label.clone(),
            position: record.position,
            prompt,
        })
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self
                .schema
                .records
                .iter()
                .filter(|r| self.answers.is_answered(&r.key))
                .count(),
            total: self.schema.len(),
        }
    }

    /// Records still unanswered, for flagging before download.
    pub fn unfilled(&self) -> Vec<&PlaceholderRecord> {
        self.schema
            .records
            .iter()
            .filter(|r| !self.answers.is_answered(&r.key))
            .collect()
    }

    /// Preview of the loaded markup.
    pub fn preview(&self) -> Preview {
        self.preview_body(&self.markup)
    }

    /// Preview of `body`: answered values wrapped in the filled marker and
    /// the next question's placeholder wrapped in the active marker.
    pub fn preview_body(&self, body: &str) -> Preview {
        let filled_marker = &self.config.filled_marker;
        let FillOutcome { body: filled, report } = substitute(
            body,
            &self.schema,
            &self.answers,
            FillMode::Highlight(filled_marker),
        );
        let reconciliation = reconcile::reconcile(&filled, &self.schema, &self.answers, filled_marker);

        let active = self
            .schema
            .records
            .iter()
            .find(|r| !self.answers.is_answered(&r.key))
            .map(|r| r.key.clone());

        let body = match &active {
            Some(key) => reconcile::highlight_active(
                &filled,
                &self.schema,
                &reconciliation,
                key,
                filled_marker,
                &self.config.active_marker,
            ),
            None => filled,
        };

        Preview {
            body,
            active,
            reconciliation,
            report,
        }
    }

    /// Final substitution over a raw document body.
    pub fn generate(&self, body: &str) -> FillOutcome {
        let outcome = substitute(body, &self.schema, &self.answers, FillMode::Final);
        if !outcome.report.is_clean() {
            warn!(issues = outcome.report.issues.len(), "generated with unplaced answers");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowPhraser;

    impl QuestionPhraser for SlowPhraser {
        fn phrase(&self, _record: &PlaceholderRecord) -> anyhow::Result<String> {
            std::thread::sleep(Duration::from_millis(500));
            Ok("too late".to_owned())
        }
    }

    struct FailingPhraser;

    impl QuestionPhraser for FailingPhraser {
        fn phrase(&self, _record: &PlaceholderRecord) -> anyhow::Result<String> {
            anyhow::bail!("service unavailable")
        }
    }

    struct FixedPhraser;

    impl QuestionPhraser for FixedPhraser {
        fn phrase(&self, record: &PlaceholderRecord) -> anyhow::Result<String> {
            Ok(format!("Kindly provide {}", record.label))
        }
    }

    fn session(plain: &str) -> FillSession {
        FillSession::new(plain, plain, FillConfig::default()).expect("session")
    }

    #[test]
    fn test_question_flow_in_document_order() {
        let mut s = session("[Company] pays $[____] to [Investor Name].");
        let q = s.next_question().expect("question");
        assert_eq!(q.key.as_str(), "company");
        assert_eq!(q.prompt, "What is the Company Name?");

        assert!(s.answer("company", "Acme").expect("answer"));
        let q = s.next_question().expect("question");
        assert_eq!(q.key.as_str(), "blank_0");
        assert_eq!(s.progress(), Progress { answered: 1, total: 3 });
    }

    #[test]
    fn test_unknown_and_empty_answers() {
        let mut s = session("[Company]");
        assert!(matches!(s.answer("ghost", "x"), Err(FillError::UnknownKey { .. })));
        assert!(!s.answer("company", "  ").expect("answer"));
        assert_eq!(s.unfilled().len(), 1);
        assert!(s.schema().records[0].value.is_none());
    }

    #[test]
    fn test_answer_all_is_atomic_on_unknown_key() {
        let mut s = session("[Company] [Title]");
        let err = s.answer_all([("company", "Acme"), ("ghost", "x")]);
        assert!(err.is_err());
        assert!(s.answers().is_empty());
        assert_eq!(s.answer_all([("company", "Acme"), ("title", "")]).expect("batch"), 1);
    }

    #[test]
    fn test_answer_sets_record_value() {
        let mut s = session("[Title]");
        s.answer("title", "CEO").expect("answer");
        assert_eq!(s.schema().records[0].value.as_deref(), Some("CEO"));
        assert!(s.next_question().is_none());
    }

    #[test]
    fn test_slow_phraser_falls_back_to_template() {
        let config = FillConfig {
            phrasing_timeout_ms: 20,
            ..FillConfig::default()
        };
        let s = FillSession::new("[Title]", "[Title]", config)
            .expect("session")
            .with_phraser(Arc::new(SlowPhraser));
        assert_eq!(s.next_question().expect("question").prompt, "What is the Title?");
    }

    #[test]
    fn test_failing_phraser_falls_back_to_template() {
        let s = session("[Title]").with_phraser(Arc::new(FailingPhraser));
        assert_eq!(s.next_question().expect("question").prompt, "What is the Title?");
    }

    #[test]
    fn test_external_phraser_used_when_fast() {
        let s = session("[Title]").with_phraser(Arc::new(FixedPhraser));
        assert_eq!(s.next_question().expect("question").prompt, "Kindly provide Title");
    }

    #[test]
    fn test_preview_highlights_active_blank() {
        let plain = "A $[____] B [____]";
        let mut s = session(plain);
        s.answer("blank_0", "$5").expect("answer");
        let preview = s.preview();
        assert_eq!(preview.active, Some(PlaceholderKey::blank(1)));
        assert_eq!(
            preview.body,
            r#"A <span class="filled">$5</span> B <mark class="active">[____]</mark>"#
        );
        assert!(preview.reconciliation.is_consistent());
    }

    #[test]
    fn test_from_markup_and_generate() {
        let markup = "<w:p><w:r><w:t>[Company] &amp; [Title]</w:t></w:r></w:p>";
        let mut s = FillSession::from_markup(markup, FillConfig::default()).expect("session");
        s.answer("company", "A&B").expect("answer");
        let out = s.generate(markup);
        assert_eq!(out.body, "<w:p><w:r><w:t>A&amp;B &amp; [Title]</w:t></w:r></w:p>");
        assert_eq!(s.unfilled().len(), 1);
    }
}
