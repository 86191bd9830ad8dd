//! Child process execution.
//!
//! [`ProcessExecutor`] runs an argv vector, captures both output streams in
//! full and reports the exit status as data. A non-zero exit is not an error
//! at this layer. No timeout is imposed; children are killed if the future
//! running them is dropped.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::ToolError;

/// Normalised outcome of one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Whether the process exited with status zero.
    pub exited_cleanly: bool,
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs child processes.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`.
    ///
    /// Fails only when the process cannot be started or its output cannot be
    /// collected.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult, ToolError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for ProcessExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult, ToolError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| ToolError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        let input = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(data)) = (input, stdin) {
                // The child may exit before reading everything.
                if let Err(e) = pipe.write_all(data.as_bytes()).await {
                    debug!(error = %e, "Failed to write child stdin");
                }
            }
        };

        let (_, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| {
            ToolError::internal(format!("Failed to collect output of {}: {}", program, e))
        })?;

        let result = ExecutionResult {
            exited_cleanly: output.status.success(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            program,
            status = ?result.status,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Process finished"
        );
        Ok(result)
    }
}
