//! Integration tests for the panel color transition engine.
//!
//! These run entirely against the in-memory settings store with stubbed
//! dominant color sources, so they exercise the full transition path
//! (notification -> schedule -> animate -> finalize) without a MATE session
//! or real wallpaper images.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::time::Duration;

use paneltint_lib::color::{PanelColor, Rgb};
use paneltint_lib::dominant::{DominantColorSource, DominantError};
use paneltint_lib::engine::ColorEngine;
use paneltint_lib::settings::{MemoryStore, SettingsStore, keys};
use parking_lot::Mutex;

/// Upper bound for a transition to finish; the animation itself takes
/// roughly half a second.
const WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// Test doubles
// ============================================================================

/// Dominant color source returning a fixed color for any path.
struct FixedColor(Rgb);

impl DominantColorSource for FixedColor {
    fn dominant_color(&self, _path: &Path) -> Result<Rgb, DominantError> { Ok(self.0) }
}

/// Dominant color source that always fails, as a missing file would.
struct FailingSource;

impl DominantColorSource for FailingSource {
    fn dominant_color(&self, path: &Path) -> Result<Rgb, DominantError> {
        Err(DominantError::Read {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A store with three panels covering the three color encodings, and a
/// static image configured as wallpaper.
fn three_panel_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.set_string_list(
        &keys::panel(),
        keys::TOPLEVEL_ID_LIST,
        &["panel-a", "panel-b", "panel-c"],
    );

    for (panel, color) in [
        ("panel-a", "#000000"),
        ("panel-b", "rgb(255,255,255)"),
        ("panel-c", "rgba(10,20,30,0.5)"),
    ] {
        let ns = keys::panel_background(panel);
        store.set_string(&ns, keys::BACKGROUND_TYPE, "none").unwrap();
        store.set_string(&ns, keys::BACKGROUND_COLOR, color).unwrap();
    }

    store
        .set_string(&keys::background(), keys::PICTURE_FILENAME, "/tmp/wall.jpg")
        .unwrap();

    store
}

fn panel_color(store: &MemoryStore, panel: &str) -> String {
    store.get_string(&keys::panel_background(panel), keys::BACKGROUND_COLOR).unwrap()
}

fn panel_type(store: &MemoryStore, panel: &str) -> String {
    store.get_string(&keys::panel_background(panel), keys::BACKGROUND_TYPE).unwrap()
}

/// Counts writes to one panel's background namespace.
fn count_panel_writes(store: &Arc<MemoryStore>, panel: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);
    let handle = store
        .watch(
            &keys::panel_background(panel),
            Box::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
    // keep the subscription alive for the whole test
    std::mem::forget(handle);
    count
}

// ============================================================================
// Transitions
// ============================================================================

#[test]
fn test_all_panels_reach_exact_target_in_their_original_encoding() {
    let store = three_panel_store();
    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );

    engine.trigger_now();
    assert!(engine.wait_idle(WAIT));

    assert_eq!(panel_color(&store, "panel-a"), "#6496c8");
    assert_eq!(panel_color(&store, "panel-b"), "rgb(100,150,200)");
    assert_eq!(panel_color(&store, "panel-c"), "rgba(100,150,200,0.500000)");

    // every panel was forced to a solid color background
    for panel in ["panel-a", "panel-b", "panel-c"] {
        assert_eq!(panel_type(&store, panel), "color");
    }

    assert_eq!(engine.current_color(), Rgb::new(100, 150, 200));
}

#[test]
fn test_wallpaper_change_notification_drives_a_transition() {
    let store = three_panel_store();
    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(64, 64, 64))),
    );

    engine.enable().unwrap();
    store
        .set_string(&keys::background(), keys::PICTURE_FILENAME, "/tmp/other.png")
        .unwrap();
    assert!(engine.wait_idle(WAIT));

    assert_eq!(engine.wallpaper_path(), std::path::PathBuf::from("/tmp/other.png"));
    assert_eq!(panel_color(&store, "panel-a"), "#404040");
}

#[test]
fn test_disabled_engine_ignores_wallpaper_changes() {
    let store = three_panel_store();
    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(1, 2, 3))),
    );

    engine.enable().unwrap();
    engine.disable();

    store
        .set_string(&keys::background(), keys::PICTURE_FILENAME, "/tmp/other.png")
        .unwrap();
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(panel_color(&store, "panel-a"), "#000000");
    assert!(!engine.is_transitioning());
}

#[test]
fn test_disable_does_not_cancel_in_flight_transition() {
    let store = three_panel_store();
    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );

    engine.enable().unwrap();
    engine.trigger_now();
    engine.disable();
    assert!(engine.wait_idle(WAIT));

    assert_eq!(panel_color(&store, "panel-a"), "#6496c8");
}

#[test]
fn test_panel_sees_ordered_steps_then_exact_final_write() {
    let store = three_panel_store();
    let values = Arc::new(Mutex::new(Vec::new()));

    let values_clone = Arc::clone(&values);
    let reader = Arc::clone(&store);
    let handle = store
        .watch(
            &keys::panel_background("panel-a"),
            Box::new(move |key| {
                if key == keys::BACKGROUND_COLOR {
                    values_clone.lock().push(panel_color(&reader, "panel-a"));
                }
            }),
        )
        .unwrap();

    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );
    engine.trigger_now();
    assert!(engine.wait_idle(WAIT));
    drop(handle);

    let values = values.lock();
    // 24 animation steps plus the exact final write
    assert_eq!(values.len(), 25);
    assert_eq!(values.last().unwrap(), "#6496c8");

    // rising from black, every channel is monotonically non-decreasing
    let reds: Vec<u8> = values
        .iter()
        .map(|v| PanelColor::parse(v).unwrap().rgb().r)
        .collect();
    assert!(reds.windows(2).all(|pair| pair[0] <= pair[1]));
}

// ============================================================================
// Scoping and skipping
// ============================================================================

#[test]
fn test_restricted_transition_touches_only_that_panel() {
    let store = three_panel_store();
    let a_writes = count_panel_writes(&store, "panel-a");
    let c_writes = count_panel_writes(&store, "panel-c");

    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );
    engine.restrict_to_panel(Some("panel-b"));
    engine.trigger_now();
    assert!(engine.wait_idle(WAIT));

    assert_eq!(panel_color(&store, "panel-b"), "rgb(100,150,200)");
    assert_eq!(panel_type(&store, "panel-b"), "color");

    assert_eq!(a_writes.load(Ordering::SeqCst), 0);
    assert_eq!(c_writes.load(Ordering::SeqCst), 0);
    assert_eq!(panel_color(&store, "panel-a"), "#000000");
    assert_eq!(panel_type(&store, "panel-a"), "none");
    assert_eq!(panel_color(&store, "panel-c"), "rgba(10,20,30,0.5)");
}

#[test]
fn test_xml_wallpaper_produces_zero_writes() {
    let store = three_panel_store();
    let a_writes = count_panel_writes(&store, "panel-a");
    let b_writes = count_panel_writes(&store, "panel-b");

    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );
    engine.enable().unwrap();

    for slideshow in ["/usr/share/backgrounds/cosmos.xml", "/tmp/slide.XML"] {
        store
            .set_string(&keys::background(), keys::PICTURE_FILENAME, slideshow)
            .unwrap();
        assert!(engine.wait_idle(WAIT));
    }

    assert_eq!(a_writes.load(Ordering::SeqCst), 0);
    assert_eq!(b_writes.load(Ordering::SeqCst), 0);
    // the path is still recorded as the last observed wallpaper
    assert_eq!(engine.wallpaper_path(), std::path::PathBuf::from("/tmp/slide.XML"));
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_extraction_failure_leaves_all_panels_untouched() {
    let store = three_panel_store();
    let a_writes = count_panel_writes(&store, "panel-a");

    let engine =
        ColorEngine::new(Arc::clone(&store) as Arc<dyn SettingsStore>, Arc::new(FailingSource));
    engine.trigger_now();
    assert!(engine.wait_idle(WAIT));

    assert_eq!(a_writes.load(Ordering::SeqCst), 0);
    assert_eq!(panel_color(&store, "panel-a"), "#000000");
    assert_eq!(panel_color(&store, "panel-b"), "rgb(255,255,255)");
    assert_eq!(engine.current_color(), Rgb::default());

    // the failure is local to the attempt: a later trigger still works
    assert!(!engine.is_transitioning());
}

#[test]
fn test_unparseable_panel_color_aborts_before_any_write() {
    let store = three_panel_store();
    store
        .set_string(&keys::panel_background("panel-b"), keys::BACKGROUND_COLOR, "gradient")
        .unwrap();
    let a_writes = count_panel_writes(&store, "panel-a");
    let c_writes = count_panel_writes(&store, "panel-c");

    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );
    engine.trigger_now();
    assert!(engine.wait_idle(WAIT));

    // the bad value on panel-b keeps every panel untouched, including the
    // ones that would have parsed fine
    assert_eq!(a_writes.load(Ordering::SeqCst), 0);
    assert_eq!(c_writes.load(Ordering::SeqCst), 0);
    assert_eq!(panel_color(&store, "panel-a"), "#000000");
    assert_eq!(panel_type(&store, "panel-a"), "none");
}

// ============================================================================
// Completion callback
// ============================================================================

#[test]
fn test_completion_callback_fires_after_transition() {
    let store = three_panel_store();
    let engine = ColorEngine::new(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Arc::new(FixedColor(Rgb::new(100, 150, 200))),
    );

    let (tx, rx) = channel();
    engine.set_on_complete(Arc::new(move || {
        tx.send(()).unwrap();
    }));

    engine.trigger_now();
    rx.recv_timeout(WAIT).unwrap();

    // by the time the callback fires, the final color is already stored
    assert_eq!(panel_color(&store, "panel-a"), "#6496c8");
}

#[test]
fn test_completion_callback_does_not_fire_on_failure() {
    let store = three_panel_store();
    let engine =
        ColorEngine::new(Arc::clone(&store) as Arc<dyn SettingsStore>, Arc::new(FailingSource));

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = Arc::clone(&fired);
    engine.set_on_complete(Arc::new(move || {
        fired_clone.fetch_add(1, Ordering::SeqCst);
    }));

    engine.trigger_now();
    assert!(engine.wait_idle(WAIT));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
