//! CLI layer for graph-search-agent.
//!
//! Provides the command-line interface using clap, with commands for
//! answering queries from a graph snapshot and managing prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
