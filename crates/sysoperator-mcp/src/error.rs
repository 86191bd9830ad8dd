//! Server error types.

use thiserror::Error;

/// Failures on the server's input or output stream.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to write response: {0}")]
    WriteError(std::io::Error),

    #[error("failed to read request: {0}")]
    ReadError(std::io::Error),
}

/// Errors that end a server session. Per-request problems are JSON-RPC errors instead.
#[derive(Debug, Error)]
pub enum McpError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server itself failed, e.g. its writer task panicked.
    #[error("server error: {0}")]
    Server(String),
}

impl McpError {
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}

impl From<McpError> for sysoperator_core::Error {
    fn from(e: McpError) -> Self {
        sysoperator_core::Error::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_name_the_direction() {
        let err = TransportError::ReadError(std::io::Error::other("pipe closed"));
        assert_eq!(err.to_string(), "failed to read request: pipe closed");

        let err: McpError = TransportError::WriteError(std::io::Error::other("broken pipe")).into();
        assert_eq!(err.to_string(), "failed to write response: broken pipe");
    }

    #[test]
    fn test_server_error_converts_to_internal() {
        let err = McpError::server("writer task panicked");
        assert_eq!(err.to_string(), "server error: writer task panicked");

        let core_err: sysoperator_core::Error = err.into();
        assert!(matches!(core_err, sysoperator_core::Error::Internal(_)));
    }
}
