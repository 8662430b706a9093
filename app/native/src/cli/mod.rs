//! CLI module for Paneltint.
//!
//! The same binary serves as the long-running daemon (`paneltint watch`) and
//! as a set of one-shot commands for applying, inspecting and debugging
//! panel colors.

mod commands;

use clap::Parser;
pub use commands::Cli;

use crate::error::TintError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), TintError> {
    let cli = Cli::parse();
    cli.execute()
}
