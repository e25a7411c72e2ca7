//! `preview` tool: render the body with filled values and the active
//! question highlighted.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::server::{ToolCallResult, ToolDefinition};
use crate::session::FillSession;

use super::SessionStatus;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewParams {
    /// Body to render instead of the loaded markup, e.g. an HTML rendition.
    #[serde(default)]
    pub body_path: Option<String>,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "preview".to_owned(),
        description: "Render a live preview: answered values wrapped in the filled marker, \
            the next question's placeholder wrapped in the active marker."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "bodyPath": {
                    "type": "string",
                    "description": "Body to render (optional, defaults to the loaded markup)"
                }
            }
        }),
    }
}

/// Execute the `preview` tool.
pub fn execute(
    workspace: &Path,
    session: &FillSession,
    arguments: serde_json::Value,
) -> Result<ToolCallResult> {
    let params: PreviewParams =
        serde_json::from_value(arguments).context("invalid preview parameters")?;

    let preview = match &params.body_path {
        Some(path) => match super::read_workspace_file(workspace, path) {
            Ok(body) => session.preview_body(&body),
            Err(e) => return Ok(ToolCallResult::error(format!("{e:#}"))),
        },
        None => session.preview(),
    };

    ToolCallResult::json(&serde_json::json!({
        "preview": preview,
        "status": SessionStatus::of(session),
    }))
}
