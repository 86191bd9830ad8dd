//! Reduction of engine errors to the caller-facing taxonomy.

use sysoperator_core::{ClassifiedError, ErrorKind};
use tracing::error;

use crate::ToolError;

/// Map a failure of the call identified by `context` onto an [`ErrorKind`].
///
/// Failed processes carry their trimmed standard error as detail. Internal
/// errors are logged in full and reported generically.
pub fn classify(context: &str, err: &ToolError) -> ClassifiedError {
    match err {
        ToolError::NotFound(_) => ClassifiedError::new(ErrorKind::MethodNotFound, err.to_string()),
        ToolError::Validation(_) => ClassifiedError::new(ErrorKind::ValidationError, err.to_string()),
        ToolError::UnsupportedAction { .. } => {
            ClassifiedError::new(ErrorKind::UnsupportedAction, err.to_string())
        }
        ToolError::Precondition(_) => {
            ClassifiedError::new(ErrorKind::PreconditionFailed, err.to_string())
        }
        ToolError::Spawn { .. } => ClassifiedError::new(ErrorKind::SpawnError, err.to_string()),
        ToolError::Execution { stderr, .. } => {
            ClassifiedError::new(ErrorKind::ExecutionFailed, err.to_string()).with_detail(stderr.trim())
        }
        ToolError::Timeout(_) => ClassifiedError::new(ErrorKind::ExecutionFailed, err.to_string()),
        ToolError::Resource { .. } | ToolError::InvalidFileName(_) => {
            ClassifiedError::new(ErrorKind::ResourceError, err.to_string())
        }
        ToolError::Internal(detail) => {
            error!(context, detail = %detail, "Internal error");
            ClassifiedError::new(
                ErrorKind::InternalError,
                format!("Internal error while running {}", context),
            )
        }
    }
}
