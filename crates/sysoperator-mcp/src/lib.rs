//! # sysoperator-mcp
//!
//! Model Context Protocol server for SysOperator.
//!
//! This crate provides:
//! - JSON-RPC 2.0 message types and the MCP initialization handshake
//! - A newline-delimited stdio server that runs tool calls concurrently
//! - The read-only default inventory resource

pub mod error;
pub mod protocol;
pub mod resources;
pub mod server;

pub use error::{McpError, TransportError};
pub use protocol::{JsonRpcError, JsonRpcResponse, RequestId};
pub use resources::{ResourceProvider, DEFAULT_INVENTORY_URI};
pub use server::McpServer;
