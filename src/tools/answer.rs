//! `answer` tool: record one answer or a batch.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::server::{ToolCallResult, ToolDefinition};
use crate::session::FillSession;

use super::SessionStatus;

/// Parameters for the `answer` tool. Either `key` + `value` or `answers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerParams {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "answer".to_owned(),
        description: "Record the answer for a placeholder key, or several at once via \
            `answers`. Answering a key again replaces its value; an empty value leaves it \
            unanswered. Returns progress and the next question."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Placeholder key, e.g. `company_name` or `blank_0`"
                },
                "value": {
                    "type": "string",
                    "description": "The answer text, inserted verbatim"
                },
                "answers": {
                    "type": "object",
                    "description": "Batch of key → value answers",
                    "additionalProperties": { "type": "string" }
                }
            }
        }),
    }
}

/// Execute the `answer` tool.
pub fn execute(session: &mut FillSession, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: AnswerParams =
        serde_json::from_value(arguments).context("invalid answer parameters")?;

    let mut batch: Vec<(&str, &str)> = params
        .answers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    match (&params.key, &params.value) {
        (Some(key), Some(value)) => batch.push((key.as_str(), value.as_str())),
        (Some(_), None) => bail!("`value` is required with `key`"),
        (None, Some(_)) => bail!("`key` is required with `value`"),
        (None, None) if batch.is_empty() => bail!("provide `key` and `value`, or `answers`"),
        (None, None) => {}
    }
    let submitted = batch.len();

    let stored = match session.answer_all(batch) {
        Ok(n) => n,
        Err(e) => return Ok(ToolCallResult::error(e)),
    };

    ToolCallResult::json(&serde_json::json!({
        "stored": stored,
        "ignoredEmpty": submitted - stored,
        "status": SessionStatus::of(session),
    }))
}
