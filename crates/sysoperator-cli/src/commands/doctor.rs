//! Diagnostic command to check installation.

use sysoperator_core::Config;
use sysoperator_tools::{CapabilityProbe, SystemProbe};

use crate::AppContext;

/// Executables the built-in tools invoke.
const EXECUTABLES: &[(&str, &str)] = &[
    ("ansible-playbook", "playbooks, syntax checks, cloud tools"),
    ("ansible-inventory", "inventory listing, dynamic inventory"),
    ("ansible", "ad-hoc commands"),
    ("ansible-vault", "vault tools"),
    ("aws", "credential check"),
    ("terraform", "terraform"),
    ("tflocal", "terraform with useLocalstack"),
    ("zip", "lambda inline code"),
];

pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    let config_dir = Config::config_dir();
    println!("Config directory: {:?}", config_dir);
    if config_dir.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (defaults are used)");
    }

    let result = ctx.config.validate();
    if result.is_ok() {
        println!("  ✓ Configuration is valid");
    } else {
        for error in result.errors() {
            println!("  ✗ {}: {}", error.field, error.message);
        }
    }

    let inventory = &ctx.config.resources.default_inventory;
    println!("\nDefault inventory: {:?}", inventory);
    if inventory.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Not found (resource is not listed)");
    }

    println!("\nExecutables:");
    let probe = SystemProbe;
    for (program, used_by) in EXECUTABLES {
        if probe.is_available(program).await {
            println!("  ✓ {} ({})", program, used_by);
        } else {
            println!("  ✗ {} not found ({})", program, used_by);
        }
    }

    println!("\nAWS credentials:");
    if probe.aws_credentials_valid().await {
        println!("  ✓ Valid");
    } else {
        println!("  ✗ Missing or rejected (aws sts get-caller-identity failed)");
    }

    println!("\nDiagnostics complete.");
    Ok(())
}
