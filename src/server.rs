//! MCP server for fill sessions: stdio transport, JSON-RPC 2.0,
//! newline-delimited.
//!
//! The chat front end drives one fill session through tool calls:
//! 1. `initialize` / `notifications/initialized`
//! 2. `tools/call load_template` builds the schema
//! 3. `tools/call answer` once per question, `preview` after each answer
//! 4. `tools/call generate` writes the filled body
//! 5. Client closes stdin → server exits, discarding the session

use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::FillConfig;
use crate::tools::ToolRouter;

/// Maximum size of a single JSON-RPC line (32 MiB). Bodies travel by path,
/// but batch answers and inline text can still be large.
const MAX_LINE_BYTES: usize = 32 * 1024 * 1024;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

/// MCP server info returned in initialize response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    name: String,
    version: String,
}

/// MCP server capabilities.
#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolsCapability {
    list_changed: bool,
}

/// MCP initialize result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

/// MCP tool definition for tools/list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// MCP tools/list result.
#[derive(Debug, Serialize)]
struct ToolsListResult {
    tools: Vec<ToolDefinition>,
}

/// MCP tools/call params.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// MCP content item in tools/call response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_owned(),
            text: text.into(),
        }
    }
}

/// MCP tools/call result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Successful result with one text item.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    /// Successful result carrying pretty-printed JSON.
    pub fn json(value: &impl Serialize) -> Result<Self> {
        let text = serde_json::to_string_pretty(value).context("failed to serialize tool result")?;
        Ok(Self::ok(text))
    }

    /// Tool-level failure reported to the client (not a protocol error).
    pub fn error(text: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ContentItem::text(format!("Error: {text}"))],
            is_error: true,
        }
    }
}

// ---------------------------------------------------------------------------
// MCP Server configuration
// ---------------------------------------------------------------------------

/// Configuration for the MCP server.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Directory that template, body, and output paths must stay inside.
    pub workspace: PathBuf,
    /// Settings applied to every fill session.
    pub fill: FillConfig,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            fill: FillConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC error codes
// ---------------------------------------------------------------------------

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

impl JsonRpcResponse {
    fn success(id: Option<serde_json::Value>, result: &impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(v) => Self {
                jsonrpc: "2.0".to_owned(),
                id,
                result: Some(v),
                error: None,
            },
            Err(e) => {
                error!(error = %e, "failed to serialize result");
                Self::failure(id, INTERNAL_ERROR, format!("failed to serialize result: {e}"))
            }
        }
    }

    fn failure(id: Option<serde_json::Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Run the MCP server on stdin/stdout.
///
/// Exits when stdin is closed; the session dies with the process.
///
/// # Errors
///
/// Returns an error if stdin/stdout I/O fails fatally.
pub fn run_mcp_server(config: McpServerConfig) -> Result<()> {
    info!(workspace = %config.workspace.display(), "docfill MCP server starting");

    let mut router = ToolRouter::new(config.workspace, config.fill);
    let stdin = std::io::stdin();
    serve(stdin.lock(), std::io::stdout().lock(), &mut router)?;

    info!("docfill MCP server stopped");
    Ok(())
}

/// Answer newline-delimited requests from `reader` on `writer` until EOF.
///
/// Requests are handled strictly one at a time, so an answer is applied
/// before the next request is read.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn serve(mut reader: impl BufRead, mut writer: impl Write, router: &mut ToolRouter) -> Result<()> {
    loop {
        let response = match read_request_line(&mut reader, MAX_LINE_BYTES)? {
            RequestLine::Eof => {
                debug!("input closed");
                return Ok(());
            }
            RequestLine::Malformed(reason) => {
                warn!(%reason, "unreadable request line");
                Some(JsonRpcResponse::failure(None, PARSE_ERROR, reason))
            }
            RequestLine::Text(line) if line.trim().is_empty() => None,
            RequestLine::Text(line) => handle_line(router, line.trim()),
        };
        if let Some(resp) = response {
            write_response(&mut writer, &resp)?;
        }
    }
}

/// Parse one request and dispatch it. Notifications get no response.
fn handle_line(router: &mut ToolRouter, line: &str) -> Option<JsonRpcResponse> {
    debug!(raw = line, "received request");

    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "invalid JSON-RPC request");
            return Some(JsonRpcResponse::failure(None, PARSE_ERROR, format!("parse error: {e}")));
        }
    };
    if request.jsonrpc != "2.0" {
        warn!(version = %request.jsonrpc, "unsupported JSON-RPC version");
        return Some(JsonRpcResponse::failure(
            request.id,
            INVALID_REQUEST,
            format!("jsonrpc must be \"2.0\", got \"{}\"", request.jsonrpc),
        ));
    }

    let response = dispatch(router, &request);
    if request.id.is_none() {
        debug!(method = request.method, "notification handled");
        return None;
    }
    response
}

/// Route a request to its handler.
fn dispatch(router: &mut ToolRouter, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = req.id.clone();
    match req.method.as_str() {
        "initialize" => Some(JsonRpcResponse::success(id, &initialize_result())),
        "notifications/initialized" => {
            info!("client initialized");
            None
        }
        "tools/list" => Some(JsonRpcResponse::success(
            id,
            &ToolsListResult {
                tools: router.list_tools(),
            },
        )),
        "tools/call" => Some(handle_tools_call(router, req)),
        "ping" => Some(JsonRpcResponse::success(id, &serde_json::json!({}))),
        _ => {
            warn!(method = req.method, "unknown method");
            Some(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {}", req.method),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn initialize_result() -> InitializeResult {
    InitializeResult {
        protocol_version: "2025-06-18".to_owned(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: ServerInfo {
            name: "docfill".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        },
    }
}

fn handle_tools_call(router: &mut ToolRouter, req: &JsonRpcRequest) -> JsonRpcResponse {
    let params: ToolCallParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::failure(
                req.id.clone(),
                INVALID_PARAMS,
                format!("invalid tools/call params: {e}"),
            );
        }
    };

    // Tool failures are results the client shows, not protocol errors.
    let result = router
        .call_tool(&params.name, params.arguments)
        .unwrap_or_else(|e| {
            error!(tool = params.name, error = %e, "tool call failed");
            ToolCallResult::error(format!("{e:#}"))
        });
    JsonRpcResponse::success(req.id.clone(), &result)
}

// ---------------------------------------------------------------------------
// Line I/O
// ---------------------------------------------------------------------------

/// Write one response as a single line and flush.
fn write_response(out: &mut impl Write, resp: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(resp).context("failed to serialize response")?;
    debug!(response = json, "sending response");
    writeln!(out, "{json}").context("failed to write response")?;
    out.flush().context("failed to flush response")
}

/// One line of input.
#[derive(Debug, PartialEq, Eq)]
enum RequestLine {
    Eof,
    Text(String),
    /// Too long or not UTF-8; the whole line has been consumed.
    Malformed(String),
}

/// Read one line of at most `max_bytes`, newline included.
fn read_request_line(reader: &mut impl BufRead, max_bytes: usize) -> Result<RequestLine> {
    let mut bytes = Vec::new();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let read = reader
        .by_ref()
        .take(limit)
        .read_until(b'\n', &mut bytes)
        .context("failed to read request")?;
    if read == 0 {
        return Ok(RequestLine::Eof);
    }
    if read > max_bytes {
        if bytes.last() != Some(&b'\n') {
            reader.skip_until(b'\n').context("failed to skip oversized request")?;
        }
        return Ok(RequestLine::Malformed(format!(
            "request exceeds maximum size ({max_bytes} bytes)"
        )));
    }
    match String::from_utf8(bytes) {
        Ok(line) => Ok(RequestLine::Text(line)),
        Err(_) => Ok(RequestLine::Malformed("request is not valid UTF-8".to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: Option<serde_json::Value>, method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_owned(),
            id,
            method: method.to_owned(),
            params,
        }
    }

    fn router() -> ToolRouter {
        ToolRouter::new(PathBuf::from("."), FillConfig::default())
    }

    #[test]
    fn test_initialize_reports_server_name() {
        let resp = dispatch(&mut router(), &request(Some(serde_json::json!(1)), "initialize", serde_json::Value::Null))
            .expect("response");
        let result = resp.result.expect("result");
        assert_eq!(result["serverInfo"]["name"], "docfill");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn test_initialized_notification_has_no_response() {
        let resp = dispatch(&mut router(), &request(None, "notifications/initialized", serde_json::Value::Null));
        assert!(resp.is_none());
    }

    #[test]
    fn test_unknown_method() {
        let resp = dispatch(&mut router(), &request(Some(serde_json::json!(7)), "resources/list", serde_json::Value::Null))
            .expect("response");
        assert_eq!(resp.error.expect("error").code, -32601);
    }

    #[test]
    fn test_tools_call_invalid_params() {
        let resp = dispatch(
            &mut router(),
            &request(Some(serde_json::json!(2)), "tools/call", serde_json::json!({"arguments": {}})),
        )
        .expect("response");
        assert_eq!(resp.error.expect("error").code, -32602);
    }

    #[test]
    fn test_tools_call_bad_arguments_become_error_result() {
        let resp = dispatch(
            &mut router(),
            &request(
                Some(serde_json::json!(3)),
                "tools/call",
                serde_json::json!({"name": "load_template", "arguments": {}}),
            ),
        )
        .expect("response");
        let result = resp.result.expect("result");
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .expect("text")
            .contains("invalid load_template parameters"));
    }

    #[test]
    fn test_read_request_line() {
        let mut reader = std::io::Cursor::new(b"{\"a\":1}\nsecond\n".to_vec());
        assert_eq!(
            read_request_line(&mut reader, 64).expect("line"),
            RequestLine::Text("{\"a\":1}\n".to_owned())
        );

        let mut reader = std::io::Cursor::new(b"0123456789\nnext\n".to_vec());
        assert!(matches!(
            read_request_line(&mut reader, 4).expect("line"),
            RequestLine::Malformed(_)
        ));
        assert_eq!(
            read_request_line(&mut reader, 64).expect("line"),
            RequestLine::Text("next\n".to_owned())
        );
        assert_eq!(read_request_line(&mut reader, 64).expect("eof"), RequestLine::Eof);

        let mut reader = std::io::Cursor::new(b"\xff\xfe\n".to_vec());
        assert!(matches!(
            read_request_line(&mut reader, 64).expect("line"),
            RequestLine::Malformed(_)
        ));
    }

    fn run(input: &str, router: &mut ToolRouter) -> Vec<serde_json::Value> {
        let mut output = Vec::new();
        serve(std::io::Cursor::new(input.as_bytes().to_vec()), &mut output, router).expect("serve");
        String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|l| serde_json::from_str(l).expect("response is JSON"))
            .collect()
    }

    #[test]
    fn test_serve_answers_each_request_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("t.xml"), "<w:p><w:t>Signed by [Title].</w:t></w:p>").expect("write");
        let mut router = ToolRouter::new(dir.path().to_path_buf(), FillConfig::default());

        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"load_template","arguments":{"markupPath":"t.xml"}}}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"answer","arguments":{"key":"title","value":"CEO"}}}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"preview","arguments":{}}}"#,
        ]
        .join("\n");

        let responses = run(&input, &mut router);
        let ids: Vec<&serde_json::Value> = responses.iter().map(|r| &r["id"]).collect();
        assert_eq!(ids, vec![&serde_json::json!(1), &serde_json::json!(2), &serde_json::json!(3), &serde_json::json!(4)]);

        let preview = responses[3]["result"]["content"][0]["text"].as_str().expect("text");
        assert!(preview.contains("Signed by"));
        assert!(preview.contains("CEO"));
        assert_eq!(router.session().expect("session").progress().answered, 1);
    }

    #[test]
    fn test_serve_recovers_from_bad_lines() {
        let input = [
            "not json",
            r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":6,"method":"ping"}"#,
        ]
        .join("\n");

        let responses = run(&input, &mut router());
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["error"]["code"], INVALID_REQUEST);
        assert_eq!(responses[1]["id"], 5);
        assert_eq!(responses[2]["result"], serde_json::json!({}));
    }
}
