//! Error types for SysOperator.
//!
//! Two layers live here: [`Error`], the application-level error used by the
//! configuration system and the binary, and the closed taxonomy
//! ([`ErrorKind`], [`ClassifiedError`]) that every failed tool call is reduced
//! to before it reaches a caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors outside a tool call: configuration and server plumbing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// A hint for the operator, when one applies.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some(
                "Check ~/.config/sysoperator/config.toml and .sysoperator.toml, or run 'sysoperator config validate'",
            ),
            Error::Internal(_) => None,
        }
    }
}

/// Render an error followed by its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    match error.recovery_suggestion() {
        Some(suggestion) => format!("{}\n  Suggestion: {}", error, suggestion),
        None => error.to_string(),
    }
}

/// The closed set of failure kinds a tool call can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Payload missing or carrying invalid fields.
    ValidationError,
    /// Action value not recognised by a builder.
    UnsupportedAction,
    /// Required executable absent or a referenced path does not exist.
    PreconditionFailed,
    /// The child process could not be started.
    SpawnError,
    /// The child process exited non-zero.
    ExecutionFailed,
    /// Workspace creation or file materialisation failed.
    ResourceError,
    /// No tool is registered under the requested name.
    MethodNotFound,
    /// Anything else.
    InternalError,
}

impl ErrorKind {
    /// Stable textual name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::UnsupportedAction => "UnsupportedAction",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::SpawnError => "SpawnError",
            ErrorKind::ExecutionFailed => "ExecutionFailed",
            ErrorKind::ResourceError => "ResourceError",
            ErrorKind::MethodNotFound => "MethodNotFound",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// Whether the caller caused the failure (bad name, payload or action).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationError | ErrorKind::UnsupportedAction | ErrorKind::MethodNotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call reduced to one taxonomy kind, with caller-safe detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    /// Failure kind
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Raw standard error of the failing process, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ClassifiedError {
    /// Create a classified error without detail.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach detail. Blank detail is dropped.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.trim().is_empty() {
            self.detail = Some(detail);
        }
        self
    }

    /// Render the caller-facing diagnostic text.
    pub fn render(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {}\nDetails: {}", self.kind, self.message, detail),
            None => format!("{}: {}", self.kind, self.message),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for ClassifiedError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_detail() {
        let err = ClassifiedError::new(ErrorKind::PreconditionFailed, "Playbook not found: site.yml");
        assert_eq!(err.render(), "PreconditionFailed: Playbook not found: site.yml");
    }

    #[test]
    fn test_render_with_detail() {
        let err = ClassifiedError::new(ErrorKind::ExecutionFailed, "ansible exited with status 2")
            .with_detail("ERROR! the playbook could not be found");
        assert_eq!(
            err.render(),
            "ExecutionFailed: ansible exited with status 2\nDetails: ERROR! the playbook could not be found"
        );
    }

    #[test]
    fn test_blank_detail_is_dropped() {
        let err = ClassifiedError::new(ErrorKind::ExecutionFailed, "failed").with_detail("  \n");
        assert!(err.detail.is_none());
    }

    #[test]
    fn test_caller_error_kinds() {
        assert!(ErrorKind::ValidationError.is_caller_error());
        assert!(ErrorKind::MethodNotFound.is_caller_error());
        assert!(!ErrorKind::ExecutionFailed.is_caller_error());
        assert!(!ErrorKind::InternalError.is_caller_error());
    }

    #[test]
    fn test_config_error_has_suggestion() {
        let err = Error::Config("bad value".to_string());
        let text = format_error_with_suggestion(&err);
        assert!(text.starts_with("Configuration error: bad value\n  Suggestion: "));
        assert!(text.contains("sysoperator config validate"));

        let err = Error::Internal("oops".to_string());
        assert_eq!(format_error_with_suggestion(&err), "Internal error: oops");
    }
}
