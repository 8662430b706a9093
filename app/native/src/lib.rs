//! Paneltint - recolor MATE panels to the dominant color of the wallpaper.
//!
//! The engine watches the MATE wallpaper setting; when the wallpaper changes
//! to a new image it computes the image's dominant color and animates every
//! managed panel's background from its current color to it, preserving each
//! panel's stored color encoding. Slideshow and gradient wallpapers have no
//! single dominant color and are skipped.
//!
//! [`engine::ColorEngine`] is the core type; [`settings`] provides the
//! store backends it runs against.

pub mod cli;
pub mod color;
pub mod config;
pub mod dominant;
pub mod engine;
pub mod error;
pub mod logging;
pub mod schema;
pub mod settings;
pub mod utils;
