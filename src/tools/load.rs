//! `load_template` tool: read a template and start a fresh fill session.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::config::FillConfig;
use crate::server::{ToolCallResult, ToolDefinition};
use crate::session::FillSession;

use super::SessionStatus;

/// Parameters for the `load_template` tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadParams {
    /// Markup rendition (e.g. `word/document.xml` extracted from a DOCX).
    pub markup_path: String,
    /// Plain-text rendition. Derived from the markup when absent.
    #[serde(default)]
    pub plain_text_path: Option<String>,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "load_template".to_owned(),
        description: "Load a template and extract its placeholder schema. Replaces any \
            previously loaded template and discards its answers."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "markupPath": {
                    "type": "string",
                    "description": "Path to the document markup (WordprocessingML body)"
                },
                "plainTextPath": {
                    "type": "string",
                    "description": "Path to the plain-text rendition (optional, derived from markup if omitted)"
                }
            },
            "required": ["markupPath"]
        }),
    }
}

/// Execute the `load_template` tool, storing the new session in `slot`.
///
/// The previous session survives when the new template cannot be read or
/// decoded.
pub fn execute(
    workspace: &Path,
    config: &FillConfig,
    slot: &mut Option<FillSession>,
    arguments: serde_json::Value,
) -> Result<ToolCallResult> {
    let params: LoadParams =
        serde_json::from_value(arguments).context("invalid load_template parameters")?;

    let markup = match super::read_workspace_file(workspace, &params.markup_path) {
        Ok(text) => text,
        Err(e) => return Ok(ToolCallResult::error(format!("{e:#}"))),
    };
    let session = match &params.plain_text_path {
        Some(plain_path) => {
            let plain = match super::read_workspace_file(workspace, plain_path) {
                Ok(text) => text,
                Err(e) => return Ok(ToolCallResult::error(format!("{e:#}"))),
            };
            FillSession::new(&plain, &markup, config.clone())
        }
        None => FillSession::from_markup(&markup, config.clone()),
    };
    let session = match session {
        Ok(s) => s,
        Err(e) => return Ok(ToolCallResult::error(e)),
    };

    info!(
        markup = params.markup_path,
        keys = session.schema().len(),
        "template loaded"
    );
    let result = ToolCallResult::json(&serde_json::json!({
        "records": session.schema().records,
        "status": SessionStatus::of(&session),
    }))?;
    *slot = Some(session);
    Ok(result)
}
