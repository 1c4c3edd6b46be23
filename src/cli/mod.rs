//! Command-line interface for the `mmatch` tool.

pub mod commands;
