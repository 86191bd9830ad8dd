//! Tool call envelope and catalogue types.

use serde::{Deserialize, Serialize};

use crate::error::ClassifiedError;

/// Catalogue entry for a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the arguments
    pub input_schema: serde_json::Value,
}

/// A request to call a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Raw tool arguments
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The operation succeeded and produced this text.
    Success(String),
    /// The operation failed.
    Failure(ClassifiedError),
}

impl ToolOutcome {
    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// Whether the call failed.
    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// The caller-facing text of the outcome.
    pub fn text(&self) -> String {
        match self {
            ToolOutcome::Success(text) => text.clone(),
            ToolOutcome::Failure(err) => err.render(),
        }
    }

    /// The classified error, if the call failed.
    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            ToolOutcome::Success(_) => None,
            ToolOutcome::Failure(err) => Some(err),
        }
    }
}

impl From<Result<String, ClassifiedError>> for ToolOutcome {
    fn from(result: Result<String, ClassifiedError>) -> Self {
        match result {
            Ok(text) => ToolOutcome::Success(text),
            Err(err) => ToolOutcome::Failure(err),
        }
    }
}
