//! Tool router: registers and dispatches MCP tool calls.
//!
//! The router owns the single active [`FillSession`]. Loading a template
//! replaces it; `reset` drops it.

pub mod answer;
pub mod generate;
pub mod load;
pub mod preview;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use crate::config::FillConfig;
use crate::server::{ToolCallResult, ToolDefinition};
use crate::session::{FillSession, Progress, Question};

/// Resolve `file_path` against the workspace and reject anything that
/// escapes it (null bytes, `..` traversal, symlinks pointing outside).
///
/// Paths that do not exist yet (outputs) are resolved through their
/// deepest existing ancestor.
pub fn validate_path(workspace: &Path, file_path: &str) -> Result<PathBuf> {
    if file_path.contains('\0') {
        bail!("path contains null byte");
    }

    let raw_path = if Path::new(file_path).is_absolute() {
        PathBuf::from(file_path)
    } else {
        workspace.join(file_path)
    };

    let canonical_workspace = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());

    let mut existing = raw_path.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
            bail!("path has no existing ancestor: {file_path}");
        };
        missing.push(name.to_os_string());
        existing = parent;
    }
    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", existing.display()))?;
    for part in missing.iter().rev() {
        if part == ".." {
            bail!("path escapes workspace boundary: {file_path}");
        }
        resolved.push(part);
    }

    if !resolved.starts_with(&canonical_workspace) {
        bail!("path escapes workspace boundary: {file_path}");
    }
    Ok(resolved)
}

/// Read a UTF-8 file inside the workspace.
pub fn read_workspace_file(workspace: &Path, file_path: &str) -> Result<String> {
    let path = validate_path(workspace, file_path)?;
    std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
}

/// Session summary returned by most tools.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus<'a> {
    pub progress: Progress,
    pub next_question: Option<Question>,
    pub unfilled: Vec<&'a str>,
}

impl<'a> SessionStatus<'a> {
    pub fn of(session: &'a FillSession) -> Self {
        Self {
            progress: session.progress(),
            next_question: session.next_question(),
            unfilled: session.unfilled().iter().map(|r| r.key.as_str()).collect(),
        }
    }
}

fn schema_definition() -> ToolDefinition {
    ToolDefinition {
        name: "schema".to_owned(),
        description: "Return the placeholder schema of the loaded template, ordered by \
            document position, with current values and the next question."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

fn reset_definition() -> ToolDefinition {
    ToolDefinition {
        name: "reset".to_owned(),
        description: "Discard the loaded template, its schema, and all answers.".to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Tool router that dispatches MCP tool calls to implementations.
pub struct ToolRouter {
    /// Directory all file paths must stay inside.
    workspace: PathBuf,
    /// Applied to every session this router creates.
    config: FillConfig,
    session: Option<FillSession>,
}

impl ToolRouter {
    pub const fn new(workspace: PathBuf, config: FillConfig) -> Self {
        Self {
            workspace,
            config,
            session: None,
        }
    }

    pub const fn session(&self) -> Option<&FillSession> {
        self.session.as_ref()
    }

    /// List all available tools with their JSON Schema definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![
            load::tool_definition(),
            schema_definition(),
            answer::tool_definition(),
            preview::tool_definition(),
            generate::tool_definition(),
            reset_definition(),
        ]
    }

    /// Call a tool by name with the given JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing workspace files fails.
    /// Unknown tools, unknown keys, and undecodable documents are reported
    /// as error results instead.
    pub fn call_tool(&mut self, name: &str, arguments: serde_json::Value) -> Result<ToolCallResult> {
        debug!(tool = name, "dispatching tool call");

        if name == "load_template" {
            return load::execute(&self.workspace, &self.config, &mut self.session, arguments);
        }
        if name == "reset" {
            let had_session = self.session.take().is_some();
            return Ok(ToolCallResult::ok(if had_session {
                "Session discarded."
            } else {
                "No session to discard."
            }));
        }

        let known = ["schema", "answer", "preview", "generate"];
        if !known.contains(&name) {
            return Ok(ToolCallResult::error(format!("Unknown tool: {name}")));
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(ToolCallResult::error(crate::FillError::NoSession));
        };

        match name {
            "schema" => ToolCallResult::json(&serde_json::json!({
                "records": session.schema().records,
                "status": SessionStatus::of(session),
            })),
            "answer" => answer::execute(session, arguments),
            "preview" => preview::execute(&self.workspace, session, arguments),
            _ => generate::execute(&self.workspace, session, arguments),
        }
    }
}
