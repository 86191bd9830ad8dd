//! Stdio protocol server.

use std::sync::Arc;

use sysoperator_mcp::McpServer;

use crate::AppContext;

pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    super::config::ensure_valid(&ctx.config)?;

    tracing::info!(
        tools = ctx.dispatcher.registry().len(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting sysoperator server"
    );
    let server = McpServer::new(Arc::clone(&ctx.dispatcher), &ctx.config);
    server.serve_stdio().await?;

    // A pending blocking read on stdin would hold the runtime open after Ctrl-C.
    std::process::exit(0)
}
