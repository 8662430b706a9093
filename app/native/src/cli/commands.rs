//! Command definitions and execution.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::config;
use crate::dominant::{AverageColor, DominantColorSource};
use crate::engine::ColorEngine;
use crate::error::TintError;
use crate::settings::{FileStore, GSettingsStore, SettingsStore, keys};
use crate::utils::path::expand;
use crate::{logging, schema};

/// How long `apply` waits for a transition before giving up. Generous: a
/// transition itself takes around half a second plus image decoding.
const APPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Recolor MATE panels to the dominant color of the desktop wallpaper.
#[derive(Parser, Debug)]
#[command(name = "paneltint", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Paneltint subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
enum Commands {
    /// Watch the wallpaper setting and recolor panels on every change.
    ///
    /// Runs until interrupted. Slideshow and gradient wallpapers (.xml
    /// descriptors) are ignored.
    Watch {
        /// Only recolor this panel (default: every panel in the panel list).
        #[arg(long, short)]
        panel: Option<String>,

        /// Drive a JSON settings document instead of the live gsettings
        /// database.
        #[arg(long, env = "PANELTINT_SETTINGS_FILE", value_name = "PATH")]
        settings_file: Option<String>,
    },

    /// Run one transition for the current wallpaper, then exit.
    Apply {
        /// Only recolor this panel (default: every panel in the panel list).
        #[arg(long, short)]
        panel: Option<String>,

        /// Drive a JSON settings document instead of the live gsettings
        /// database.
        #[arg(long, env = "PANELTINT_SETTINGS_FILE", value_name = "PATH")]
        settings_file: Option<String>,
    },

    /// Print the dominant color of an image.
    Dominant {
        /// Path to the image.
        #[arg(value_name = "IMAGE")]
        image: String,
    },

    /// List panels with their background type and color.
    Panels {
        /// Output as JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Read from a JSON settings document instead of the live gsettings
        /// database.
        #[arg(long, env = "PANELTINT_SETTINGS_FILE", value_name = "PATH")]
        settings_file: Option<String>,
    },

    /// Print the JSON schema of the configuration file.
    Schema,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Executes the parsed command.
    ///
    /// # Errors
    ///
    /// Returns a [`TintError`] describing the failure.
    pub fn execute(&self) -> Result<(), TintError> {
        let config = config::init();
        logging::init(config.log_filter.as_deref().unwrap_or("info"));

        match &self.command {
            Commands::Watch { panel, settings_file } => {
                execute_watch(panel.as_deref(), settings_file.as_deref())
            }
            Commands::Apply { panel, settings_file } => {
                execute_apply(panel.as_deref(), settings_file.as_deref())
            }
            Commands::Dominant { image } => execute_dominant(image),
            Commands::Panels { json, settings_file } => {
                execute_panels(*json, settings_file.as_deref())
            }
            Commands::Schema => {
                println!("{}", schema::generate_schema_json());
                Ok(())
            }
            Commands::Completions { shell } => {
                execute_completions(*shell);
                Ok(())
            }
        }
    }
}

/// Opens the settings store selected by the flag, config, or default.
fn open_store(settings_file: Option<&str>) -> Result<Arc<dyn SettingsStore>, TintError> {
    let path = settings_file
        .map(ToString::to_string)
        .or_else(|| config::get_config().settings_file.clone());

    match path {
        Some(path) => Ok(Arc::new(FileStore::open(expand(&path))?)),
        None => Ok(Arc::new(GSettingsStore::new())),
    }
}

fn build_engine(
    panel: Option<&str>,
    settings_file: Option<&str>,
) -> Result<ColorEngine, TintError> {
    let store = open_store(settings_file)?;
    let engine = ColorEngine::new(store, Arc::new(AverageColor));

    let restricted = panel
        .map(ToString::to_string)
        .or_else(|| config::get_config().panel.clone());
    if let Some(panel) = restricted {
        engine.restrict_to_panel(Some(panel.as_str()));
    }

    Ok(engine)
}

/// Execute the watch command: run the daemon until interrupted.
fn execute_watch(panel: Option<&str>, settings_file: Option<&str>) -> Result<(), TintError> {
    let engine = build_engine(panel, settings_file)?;
    engine.enable()?;

    let wallpaper = engine.wallpaper_path();
    println!(
        "{} watching wallpaper changes (current: {})",
        "✓".green(),
        wallpaper.display()
    );
    tracing::info!(wallpaper = %wallpaper.display(), "watching for wallpaper changes");

    loop {
        std::thread::park();
    }
}

/// Execute the apply command: one transition for the current wallpaper.
fn execute_apply(panel: Option<&str>, settings_file: Option<&str>) -> Result<(), TintError> {
    let engine = build_engine(panel, settings_file)?;

    let wallpaper = engine.wallpaper_path();
    if wallpaper.as_os_str().is_empty() {
        return Err(TintError::InvalidArguments(
            "No wallpaper is configured; nothing to apply.".to_string(),
        ));
    }
    if wallpaper
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
    {
        println!(
            "{} wallpaper is a slideshow descriptor; panels left unchanged",
            "!".yellow()
        );
        return Ok(());
    }

    let completed = Arc::new(AtomicBool::new(false));
    let completed_flag = Arc::clone(&completed);
    engine.set_on_complete(Arc::new(move || {
        completed_flag.store(true, Ordering::SeqCst);
    }));

    engine.trigger_now();
    if !engine.wait_idle(APPLY_TIMEOUT) {
        return Err(TintError::Command(
            "timed out waiting for the transition to finish".to_string(),
        ));
    }
    if !completed.load(Ordering::SeqCst) {
        return Err(TintError::Command(
            "transition aborted; see the log for details".to_string(),
        ));
    }

    let color = engine.current_color();
    println!(
        "{} {} panels set to {}",
        "✓".green(),
        "  ".on_truecolor(color.r, color.g, color.b),
        color.to_string().bold()
    );
    Ok(())
}

/// Execute the dominant command: print an image's dominant color.
fn execute_dominant(image: &str) -> Result<(), TintError> {
    let color = AverageColor.dominant_color(&expand(image))?;
    println!("{} {color}", "  ".on_truecolor(color.r, color.g, color.b));
    Ok(())
}

/// One row of `paneltint panels` output.
#[derive(Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
struct PanelRow {
    #[tabled(rename = "Panel")]
    id: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    background_type: String,
    #[tabled(rename = "Color")]
    color: String,
}

/// Execute the panels command: list panels and their backgrounds.
fn execute_panels(json: bool, settings_file: Option<&str>) -> Result<(), TintError> {
    let store = open_store(settings_file)?;
    let panels = store.get_string_list(&keys::panel(), keys::TOPLEVEL_ID_LIST)?;

    let rows: Vec<PanelRow> = panels
        .into_iter()
        .map(|id| {
            let namespace = keys::panel_background(&id);
            let background_type = store
                .get_string(&namespace, keys::BACKGROUND_TYPE)
                .unwrap_or_else(|_| "-".to_string());
            let color = store
                .get_string(&namespace, keys::BACKGROUND_COLOR)
                .unwrap_or_else(|_| "-".to_string());
            PanelRow { id, background_type, color }
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|err| TintError::Command(err.to_string()))?;
        println!("{out}");
    } else if rows.is_empty() {
        println!("No panels found.");
    } else {
        println!("{}", Table::new(&rows));
    }

    Ok(())
}

/// Execute the completions command.
fn execute_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "paneltint", &mut io::stdout());
}
