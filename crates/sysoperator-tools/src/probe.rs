//! Capability checks run before anything is spawned.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Answers whether the host can run a plan.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Whether `program` can be found on `PATH`.
    async fn is_available(&self, program: &str) -> bool;

    /// Whether cloud credentials are configured and accepted.
    async fn aws_credentials_valid(&self) -> bool;
}

/// Probe backed by `PATH` lookup and the AWS CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

#[async_trait]
impl CapabilityProbe for SystemProbe {
    async fn is_available(&self, program: &str) -> bool {
        let name = program.to_string();
        let found = match tokio::task::spawn_blocking(move || which::which(name).is_ok()).await {
            Ok(found) => found,
            Err(e) => {
                warn!(program, error = %e, "Executable lookup task failed");
                false
            }
        };
        debug!(program, found, "Probed executable");
        found
    }

    async fn aws_credentials_valid(&self) -> bool {
        let status = Command::new("aws")
            .args(["sts", "get-caller-identity"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        let valid = matches!(status, Ok(s) if s.success());
        debug!(valid, "Probed AWS credentials");
        valid
    }
}

/// Message for an executable that is not installed.
pub fn missing_executable_message(program: &str) -> String {
    format!("{} is not installed or not found in PATH", program)
}
