//! One-shot tool invocation.

use anyhow::Context;
use serde_json::Value;
use sysoperator_core::ToolCall;

use crate::AppContext;

pub async fn run(ctx: &AppContext, tool: &str, args: Option<&str>) -> anyhow::Result<()> {
    super::config::ensure_valid(&ctx.config)?;

    let arguments = match args {
        Some(raw) => serde_json::from_str(raw).context("--args must be a JSON object")?,
        None => Value::Object(Default::default()),
    };
    if !arguments.is_object() {
        anyhow::bail!("--args must be a JSON object");
    }

    let outcome = ctx.dispatcher.dispatch(&ToolCall::new(tool, arguments)).await;
    if outcome.is_error() {
        eprintln!("{}", outcome.text());
        std::process::exit(1);
    }
    println!("{}", outcome.text());
    Ok(())
}
