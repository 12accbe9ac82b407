//! CLI module for the bulk configuration tool.
//!
//! This module provides the command-line interface for applying change
//! files and checking them offline.

mod commands;
mod output;

pub use commands::{ApplyArgs, Cli, Commands, LogFormat, OutputFormat, TargetArgs, ValidateArgs};
pub use output::OutputFormatter;
