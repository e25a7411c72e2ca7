//! docfill-mcp -- standalone MCP server for filling document templates.
//!
//! Usage: docfill-mcp [--workspace <path>] [--config <path>]

use anyhow::Context;

fn arg_value(name: &str) -> Option<String> {
    std::env::args().skip_while(|a| a != name).nth(1)
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr so it does not interfere with MCP stdio.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let workspace = arg_value("--workspace").unwrap_or_else(|| ".".to_string());
    let workspace = std::path::Path::new(&workspace)
        .canonicalize()
        .with_context(|| format!("workspace not found: {workspace}"))?;

    let fill = match arg_value("--config") {
        Some(path) => docfill::FillConfig::load(std::path::Path::new(&path))?,
        None => docfill::FillConfig::default(),
    };

    let config = docfill::server::McpServerConfig { workspace, fill };

    docfill::run_mcp_server(config)
}
