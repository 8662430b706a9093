//! Panel color transition engine.
//!
//! Watches the desktop wallpaper setting and, when the wallpaper changes to a
//! new image, animates every managed panel's background color from its
//! current value to the image's dominant color. The animation runs on a
//! worker thread in 24 discrete steps with a short pause between steps, then
//! writes the exact target color so the end state never depends on float
//! rounding.
//!
//! Slideshow and gradient wallpapers (`.xml` descriptors) have no single
//! dominant color and are skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

use crate::color::{ColorParseError, PanelColor, Rgb};
use crate::dominant::{DominantColorSource, DominantError};
use crate::settings::{SettingsError, SettingsStore, WatchHandle, keys};
use crate::utils::thread::spawn_named;

/// Number of discrete animation steps in one transition.
const TRANSITION_STEPS: u32 = 24;

/// Pause between animation steps. Pacing for visible smoothness, not a
/// correctness requirement.
const STEP_DELAY: Duration = Duration::from_millis(20);

/// Errors that abort one transition attempt.
///
/// Failures are local to the attempt: the engine stays usable and the next
/// wallpaper change triggers a fresh transition.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The wallpaper's dominant color could not be computed.
    #[error("dominant color extraction failed: {0}")]
    Dominant(#[from] DominantError),
    /// A panel's stored color string matches no known encoding.
    #[error("panel '{panel}' has an unusable color value: {source}")]
    Color {
        /// The panel whose color failed to parse.
        panel: String,
        #[source]
        source: ColorParseError,
    },
    /// The settings store rejected a read or write.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Callback invoked (on the worker thread) after a transition completes.
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Drives wallpaper-change notifications into animated panel recoloring.
pub struct ColorEngine {
    inner: Arc<EngineInner>,
    subscription: Mutex<Option<WatchHandle>>,
}

struct EngineInner {
    store: Arc<dyn SettingsStore>,
    source: Arc<dyn DominantColorSource>,
    /// When set, transitions touch only this panel.
    restrict: Mutex<Option<String>>,
    /// Dominant color of the last processed wallpaper.
    dominant: Mutex<Rgb>,
    /// Wallpaper path last observed, whether or not it was processable.
    wallpaper: Mutex<String>,
    on_complete: Mutex<Option<CompletionCallback>>,
    worker: Mutex<WorkerSlot>,
}

/// Single-slot transition queue. While a transition is running, the newest
/// request waits in `pending`, replacing any earlier one.
#[derive(Default)]
struct WorkerSlot {
    running: bool,
    pending: Option<String>,
    handle: Option<JoinHandle<()>>,
}

impl ColorEngine {
    /// Creates an engine over a settings store and a dominant color source.
    ///
    /// The initially configured wallpaper path is read eagerly so
    /// [`wallpaper_path`](Self::wallpaper_path) is meaningful before the
    /// first change notification.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, source: Arc<dyn DominantColorSource>) -> Self {
        let wallpaper = store
            .get_string(&keys::background(), keys::PICTURE_FILENAME)
            .unwrap_or_default();

        Self {
            inner: Arc::new(EngineInner {
                store,
                source,
                restrict: Mutex::new(None),
                dominant: Mutex::new(Rgb::default()),
                wallpaper: Mutex::new(wallpaper),
                on_complete: Mutex::new(None),
                worker: Mutex::new(WorkerSlot::default()),
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Registers a callback to run after each completed transition.
    ///
    /// The callback runs on the worker thread; a caller updating UI from it
    /// must marshal back onto its own main thread.
    pub fn set_on_complete(&self, callback: CompletionCallback) {
        *self.inner.on_complete.lock() = Some(callback);
    }

    /// Begins observing wallpaper-change notifications.
    ///
    /// Enabling while already enabled replaces the previous subscription.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Settings`] if the store cannot establish the
    /// subscription.
    pub fn enable(&self) -> Result<(), EngineError> {
        let inner = Arc::clone(&self.inner);
        let handle = self.inner.store.watch(
            &keys::background(),
            Box::new(move |key| {
                if key == keys::PICTURE_FILENAME {
                    EngineInner::background_changed(&inner);
                }
            }),
        )?;

        *self.subscription.lock() = Some(handle);
        Ok(())
    }

    /// Stops observing wallpaper changes.
    ///
    /// An in-flight transition keeps running to completion.
    pub fn disable(&self) { *self.subscription.lock() = None; }

    /// Whether the engine is currently observing wallpaper changes.
    #[must_use]
    pub fn is_enabled(&self) -> bool { self.subscription.lock().is_some() }

    /// Runs a transition for the currently configured wallpaper, whether or
    /// not the setting changed. The animation still runs off the caller's
    /// thread; use [`wait_idle`](Self::wait_idle) to block on completion.
    pub fn trigger_now(&self) { EngineInner::background_changed(&self.inner); }

    /// Scopes all future transitions to a single panel.
    ///
    /// `None` (or an empty id) restores the default of updating every panel
    /// in the store's panel list.
    pub fn restrict_to_panel(&self, panel: Option<&str>) {
        *self.inner.restrict.lock() =
            panel.filter(|id| !id.is_empty()).map(ToString::to_string);
    }

    /// The RGB last computed as a dominant color, zero before the first run.
    #[must_use]
    pub fn current_color(&self) -> Rgb { *self.inner.dominant.lock() }

    /// The wallpaper path last observed.
    #[must_use]
    pub fn wallpaper_path(&self) -> PathBuf {
        PathBuf::from(self.inner.wallpaper.lock().clone())
    }

    /// Whether a transition is currently running.
    #[must_use]
    pub fn is_transitioning(&self) -> bool { self.inner.worker.lock().running }

    /// Blocks until no transition is running, or the timeout elapses.
    /// Returns `true` if the engine went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut worker = self.inner.worker.lock();
                if !worker.running {
                    if let Some(handle) = worker.handle.take() {
                        drop(worker);
                        let _ = handle.join();
                    }
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl EngineInner {
    /// Reacts to a picture-filename change (or a manual trigger).
    fn background_changed(this: &Arc<Self>) {
        let path = match this.store.get_string(&keys::background(), keys::PICTURE_FILENAME) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read wallpaper path");
                return;
            }
        };
        *this.wallpaper.lock() = path.clone();

        if path.is_empty() {
            tracing::debug!("no wallpaper configured, nothing to do");
            return;
        }
        if is_slideshow(&path) {
            tracing::debug!(path = %path, "wallpaper is a slideshow descriptor, skipping");
            return;
        }

        Self::schedule(this, path);
    }

    /// Hands a wallpaper path to the worker. While a transition is running
    /// the newest request replaces any queued one and runs afterwards.
    fn schedule(this: &Arc<Self>, path: String) {
        let mut worker = this.worker.lock();
        if worker.running {
            worker.pending = Some(path);
            return;
        }

        if let Some(finished) = worker.handle.take() {
            let _ = finished.join();
        }

        worker.running = true;
        let inner = Arc::clone(this);
        worker.handle = spawn_named("transition", move || inner.worker_loop(path));
        if worker.handle.is_none() {
            worker.running = false;
        }
    }

    fn worker_loop(self: Arc<Self>, mut path: String) {
        loop {
            match self.run_transition(&path) {
                Ok(()) => {
                    let callback = self.on_complete.lock().clone();
                    if let Some(callback) = callback {
                        callback();
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, path = %path, "panel color transition aborted");
                }
            }

            let mut worker = self.worker.lock();
            if let Some(next) = worker.pending.take() {
                drop(worker);
                path = next;
            } else {
                worker.running = false;
                break;
            }
        }
    }

    fn run_transition(&self, path: &str) -> Result<(), EngineError> {
        let target = self.source.dominant_color(Path::new(path))?;
        *self.dominant.lock() = target;

        // read and parse every panel before the first write, so one bad
        // stored value aborts the whole transition with all panels untouched
        let mut plans = Vec::new();
        for panel in self.target_panels()? {
            let namespace = keys::panel_background(&panel);
            let stored = self.store.get_string(&namespace, keys::BACKGROUND_COLOR)?;
            let original = PanelColor::parse(&stored)
                .map_err(|source| EngineError::Color { panel: panel.clone(), source })?;
            plans.push(PanelPlan::new(panel, original, target));
        }

        if plans.is_empty() {
            tracing::debug!("no panels to update");
            return Ok(());
        }

        tracing::info!(color = %target, panels = plans.len(), "starting panel color transition");

        for iteration in 1..=TRANSITION_STEPS {
            for plan in &plans {
                let namespace = keys::panel_background(&plan.panel);
                if iteration == 1 {
                    // force a solid color background so the change is visible
                    self.store.set_string(
                        &namespace,
                        keys::BACKGROUND_TYPE,
                        keys::BACKGROUND_TYPE_COLOR,
                    )?;
                }

                let value = plan.original.with_rgb(plan.rgb_at(iteration));
                self.store
                    .set_string(&namespace, keys::BACKGROUND_COLOR, &value.to_string())?;
            }
            std::thread::sleep(STEP_DELAY);
        }

        // write the exact target so the end state is the dominant color
        // itself, not an accumulation of float rounding
        for plan in &plans {
            let namespace = keys::panel_background(&plan.panel);
            let value = plan.original.with_rgb(target);
            self.store
                .set_string(&namespace, keys::BACKGROUND_COLOR, &value.to_string())?;
        }

        Ok(())
    }

    /// The panels this transition should touch: the restricted panel if one
    /// is set (and present in the panel list), otherwise every panel.
    fn target_panels(&self) -> Result<Vec<String>, EngineError> {
        let all = self.store.get_string_list(&keys::panel(), keys::TOPLEVEL_ID_LIST)?;
        let restrict = self.restrict.lock().clone();

        Ok(match restrict {
            Some(id) => all.into_iter().filter(|panel| *panel == id).collect(),
            None => all,
        })
    }
}

/// Per-panel plan for one transition: the original color (and encoding) plus
/// floating-point per-step channel increments.
struct PanelPlan {
    panel: String,
    original: PanelColor,
    step_r: f64,
    step_g: f64,
    step_b: f64,
}

impl PanelPlan {
    fn new(panel: String, original: PanelColor, target: Rgb) -> Self {
        let from = original.rgb();
        Self {
            panel,
            original,
            step_r: channel_step(from.r, target.r),
            step_g: channel_step(from.g, target.g),
            step_b: channel_step(from.b, target.b),
        }
    }

    /// Channel values after `iteration` animation steps.
    fn rgb_at(&self, iteration: u32) -> Rgb {
        let from = self.original.rgb();
        Rgb::new(
            channel_at(from.r, self.step_r, iteration),
            channel_at(from.g, self.step_g, iteration),
            channel_at(from.b, self.step_b, iteration),
        )
    }
}

fn channel_step(from: u8, to: u8) -> f64 {
    (f64::from(to) - f64::from(from)) / f64::from(TRANSITION_STEPS)
}

/// Truncates the float accumulator to an integer, then masks it into range.
/// The mask guards against float rounding producing an out-of-range value;
/// negative deltas stay negative floats until this point.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_at(from: u8, step: f64, iteration: u32) -> u8 {
    ((f64::from(from) + f64::from(iteration) * step) as i64 & 0xff) as u8
}

/// A MATE slideshow or gradient wallpaper is an `.xml` descriptor rather
/// than a static image; it has no single dominant color.
fn is_slideshow(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
