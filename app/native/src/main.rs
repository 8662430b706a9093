#![allow(clippy::multiple_crate_versions)]

//! Paneltint CLI entry point.
//!
//! `paneltint watch` runs the daemon; the other subcommands are one-shot
//! operations against the same engine.

fn main() {
    if let Err(err) = paneltint_lib::cli::run() {
        eprintln!("paneltint: {err}");
        std::process::exit(1);
    }
}
