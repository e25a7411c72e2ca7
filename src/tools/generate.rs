//! `generate` tool: final substitution, written atomically to the output
//! path.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::diff;
use crate::server::{ToolCallResult, ToolDefinition};
use crate::session::FillSession;
use crate::util::atomic::atomic_write;

/// Parameters for the `generate` tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams {
    /// Where the filled body is written. Parent directories are created.
    pub output_path: String,
    /// Body to fill instead of the loaded markup.
    #[serde(default)]
    pub body_path: Option<String>,
    /// Include a unified diff of the body against the filled result.
    #[serde(default = "default_diff")]
    pub diff: bool,
}

const fn default_diff() -> bool {
    true
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "generate".to_owned(),
        description: "Fill every answered placeholder and write the result. Unanswered \
            placeholders stay as they are and are listed in the response."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "outputPath": {
                    "type": "string",
                    "description": "Path to write the filled body to"
                },
                "bodyPath": {
                    "type": "string",
                    "description": "Body to fill (optional, defaults to the loaded markup)"
                },
                "diff": {
                    "type": "boolean",
                    "description": "Include a unified diff in the response (default: true)",
                    "default": true
                }
            },
            "required": ["outputPath"]
        }),
    }
}

/// Execute the `generate` tool.
pub fn execute(
    workspace: &Path,
    session: &FillSession,
    arguments: serde_json::Value,
) -> Result<ToolCallResult> {
    let params: GenerateParams =
        serde_json::from_value(arguments).context("invalid generate parameters")?;

    let body = match &params.body_path {
        Some(path) => match super::read_workspace_file(workspace, path) {
            Ok(body) => body,
            Err(e) => return Ok(ToolCallResult::error(format!("{e:#}"))),
        },
        None => session.markup().to_owned(),
    };
    let output_path = match super::validate_path(workspace, &params.output_path) {
        Ok(p) => p,
        Err(e) => return Ok(ToolCallResult::error(format!("{e:#}"))),
    };

    let outcome = session.generate(&body);
    atomic_write(&output_path, &outcome.body)?;
    info!(
        output = %output_path.display(),
        replaced = outcome.report.replaced.values().sum::<usize>(),
        issues = outcome.report.issues.len(),
        "filled document written"
    );

    let name = output_path
        .file_name()
        .map_or_else(|| params.output_path.clone(), |n| n.to_string_lossy().into_owned());
    let unfilled: Vec<&str> = session.unfilled().iter().map(|r| r.key.as_str()).collect();
    ToolCallResult::json(&serde_json::json!({
        "outputPath": output_path.display().to_string(),
        "report": outcome.report,
        "unfilled": unfilled,
        "diff": params.diff.then(|| diff::unified_diff(&name, &body, &outcome.body)),
    }))
}
