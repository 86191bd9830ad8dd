//! # sysoperator-tools
//!
//! Tool dispatch and external process orchestration for SysOperator.
//!
//! This crate provides:
//! - Parameter schemas with a validator that reports every bad field at once
//! - Pure command builders for configuration management, secrets, cloud
//!   resources and infrastructure-as-code operations
//! - Per-call temporary workspaces that are removed on every exit path
//! - A process executor and the error classifier
//!
//! ## Architecture
//!
//! Tools implement the [`Tool`] trait and are registered once with a
//! [`ToolRegistry`]. The [`Dispatcher`] looks a call up by name, validates its
//! arguments, builds a [`CommandPlan`], checks preconditions, stages any
//! auxiliary files in a [`Workspace`], runs the plan and classifies failures.
//!
//! ## Example
//!
//! ```ignore
//! use sysoperator_tools::{Dispatcher, ToolRegistry};
//!
//! let registry = ToolRegistry::with_builtins()?;
//! let dispatcher = Dispatcher::new(Arc::new(registry), &config);
//! let call = ToolCall::new("run_ad_hoc", json!({"pattern": "all", "module": "ping"}));
//! let outcome = dispatcher.dispatch(&call).await;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub mod ansible;
pub mod aws;
pub mod classify;
pub mod dispatch;
pub mod executor;
pub mod plan;
pub mod probe;
pub mod registry;
pub mod schema;
pub mod shell;
pub mod terraform;
pub mod vault;
pub mod workspace;
pub mod yaml;

pub use classify::classify;
pub use dispatch::Dispatcher;
pub use executor::{ExecutionResult, ProcessExecutor, ProcessRunner};
pub use plan::{Arg, CommandPlan, Invocation, OutputStyle, Precondition, ReportSection, WorkingDir};
pub use probe::{CapabilityProbe, SystemProbe};
pub use registry::{BuildContext, Operation, RegistryError, Tool, ToolRegistry};
pub use schema::{Field, FieldIssue, ParamSchema, ValidatedArgs};
pub use workspace::Workspace;

impl ToolRegistry {
    /// Create a registry with every built-in tool registered.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        Self::new(builtin_tools())
    }
}

/// All built-in tools, in catalogue order.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    let mut tools = Vec::new();
    tools.extend(ansible::tools());
    tools.extend(vault::tools());
    tools.extend(aws::tools());
    tools.extend(terraform::tools());
    tools
}

/// Errors that can occur while dispatching a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// Arguments failed validation. Carries every offending field.
    #[error("Invalid input: {}", schema::describe_issues(.0))]
    Validation(Vec<FieldIssue>),

    /// A builder does not recognise the requested action.
    #[error("Unsupported {tool} action: {action}")]
    UnsupportedAction { tool: String, action: String },

    /// A precondition (installed executable, existing path, credentials) failed.
    #[error("{0}")]
    Precondition(String),

    /// The child process could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child process exited unsuccessfully.
    #[error("{operation} failed: {program} exited with {}", exit_description(.status))]
    Execution {
        operation: String,
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Workspace creation or file materialisation failed.
    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A workspace file name escaped the workspace.
    #[error("invalid workspace file name: {0}")]
    InvalidFileName(PathBuf),

    /// The call exceeded the deadline imposed by the embedding server.
    #[error("Call timed out after {0} seconds")]
    Timeout(u64),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_description(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl ToolError {
    /// Create a validation error from collected issues.
    pub fn validation(issues: Vec<FieldIssue>) -> Self {
        Self::Validation(issues)
    }

    /// Create a validation error for fields that the given action requires.
    pub fn missing_for_action(action: &str, fields: &[&str]) -> Self {
        Self::Validation(
            fields
                .iter()
                .map(|field| FieldIssue::new(*field, format!("required for action '{}'", action)))
                .collect(),
        )
    }

    /// Create an unsupported action error.
    pub fn unsupported_action(tool: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnsupportedAction {
            tool: tool.into(),
            action: action.into(),
        }
    }

    /// Create a precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a resource error.
    pub fn resource(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resource {
            context: context.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
