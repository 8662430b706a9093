//! Error types for Paneltint.
//!
//! This module provides the unified error type returned by CLI commands.
//! Subsystem errors convert into it so command code can use `?` throughout.

use thiserror::Error;

use crate::color::ColorParseError;
use crate::config::ConfigError;
use crate::dominant::DominantError;
use crate::engine::EngineError;
use crate::settings::SettingsError;

/// Errors that can occur during command execution.
#[derive(Debug, Error)]
pub enum TintError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// A color string could not be parsed.
    #[error("Color error: {0}")]
    Color(#[from] ColorParseError),
    /// Dominant color extraction failed.
    #[error("Wallpaper error: {0}")]
    Dominant(#[from] DominantError),
    /// Settings store access failed.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
    /// A transition failed.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Generic command error.
    #[error("{0}")]
    Command(String),
}
