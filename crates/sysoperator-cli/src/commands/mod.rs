//! CLI command implementations.

pub mod call;
pub mod config;
pub mod doctor;
pub mod serve;
pub mod tools;
