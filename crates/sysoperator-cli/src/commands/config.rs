//! Configuration management commands.

use sysoperator_core::error::format_error_with_suggestion;
use sysoperator_core::Config;

use crate::{AppContext, ConfigAction};

pub fn handle(action: ConfigAction, ctx: &AppContext) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            if let Some(ref path) = ctx.config_path {
                println!("# layered with {}", path.display());
            }
            print!("{}", ctx.config.to_toml()?);
        }
        ConfigAction::Validate => {
            let result = ctx.config.validate();
            for warning in result.warnings() {
                println!("warning: {}: {}", warning.field, warning.message);
            }
            for error in result.errors() {
                println!("error: {}: {}", error.field, error.message);
            }
            if !result.is_ok() {
                anyhow::bail!("Configuration is invalid");
            }
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

/// Fail on validation errors and log warnings.
pub fn ensure_valid(config: &Config) -> anyhow::Result<()> {
    config
        .validate()
        .into_result()
        .map_err(|e| anyhow::anyhow!(format_error_with_suggestion(&e)))
}
