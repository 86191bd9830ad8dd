//! # sysoperator-core
//!
//! Core types and abstractions for SysOperator, the infrastructure-automation
//! tool server.
//!
//! This crate provides:
//! - The tool call envelope and catalogue descriptors
//! - The closed error taxonomy returned to callers
//! - Configuration system

pub mod config;
pub mod error;
pub mod tool;

pub use config::Config;
pub use error::{ClassifiedError, Error, ErrorKind, Result};
pub use tool::{ToolCall, ToolDescriptor, ToolOutcome};
