//! Settings store abstraction.
//!
//! The engine persists nothing itself: wallpaper and panel state live in an
//! external string-keyed settings store with last-writer-wins semantics per
//! key. This module defines the store seam plus the MATE schema addressing it
//! uses, and provides three backends:
//!
//! - [`MemoryStore`]: in-process, used by tests and previews.
//! - [`FileStore`]: a JSON document on disk, watched for external edits.
//! - [`GSettingsStore`]: the `gsettings` command line tool, for live MATE
//!   sessions.

pub mod keys;

mod file;
mod gsettings;
mod memory;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

pub use file::FileStore;
pub use gsettings::GSettingsStore;
pub use memory::MemoryStore;

/// Errors that can occur when accessing a settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The requested key does not exist in the namespace.
    #[error("key '{key}' not found in {namespace}")]
    KeyNotFound {
        /// Address of the namespace that was queried.
        namespace: String,
        /// The missing key.
        key: String,
    },
    /// The key exists but holds a value of a different type.
    #[error("value of '{key}' in {namespace} is not a {expected}")]
    WrongType {
        /// Address of the namespace that was queried.
        namespace: String,
        /// The offending key.
        key: String,
        /// The type that was expected.
        expected: &'static str,
    },
    /// A write was rejected by the backing store.
    #[error("failed to persist settings: {0}")]
    Write(String),
    /// The backend itself failed (I/O, subprocess, malformed document).
    #[error("settings backend error: {0}")]
    Backend(String),
    /// A change subscription could not be established.
    #[error("failed to watch for changes: {0}")]
    Watch(String),
}

/// A settings namespace: a schema id plus an optional relocatable path.
///
/// This mirrors how MATE addresses panel settings - a fixed schema like
/// `org.mate.background`, or a relocatable one such as
/// `org.mate.panel.toplevel.background` instantiated at a per-panel path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    schema: String,
    path: Option<String>,
}

impl Namespace {
    /// Creates a namespace for a non-relocatable schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self { schema: schema.into(), path: None }
    }

    /// Creates a namespace for a relocatable schema at a concrete path.
    pub fn with_path(schema: impl Into<String>, path: impl Into<String>) -> Self {
        Self { schema: schema.into(), path: Some(path.into()) }
    }

    /// The schema id.
    #[must_use]
    pub fn schema(&self) -> &str { &self.schema }

    /// The relocatable path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> { self.path.as_deref() }

    /// The `schema[:path]` address, as understood by `gsettings` and used as
    /// the storage key by the in-memory and file backends.
    #[must_use]
    pub fn address(&self) -> String {
        self.path.as_ref().map_or_else(
            || self.schema.clone(),
            |path| format!("{}:{}", self.schema, path),
        )
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// Callback invoked with the name of a changed key.
pub type WatchCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Keeps a change subscription alive.
///
/// Dropping the handle cancels the subscription; callbacks already running
/// finish, but no new ones are dispatched.
pub struct WatchHandle {
    active: Arc<AtomicBool>,
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    pub(crate) fn new() -> (Self, Arc<AtomicBool>) {
        let active = Arc::new(AtomicBool::new(true));
        (Self { active: Arc::clone(&active), cleanup: None }, active)
    }

    pub(crate) fn with_cleanup(cleanup: Box<dyn FnOnce() + Send>) -> (Self, Arc<AtomicBool>) {
        let active = Arc::new(AtomicBool::new(true));
        (
            Self { active: Arc::clone(&active), cleanup: Some(cleanup) },
            active,
        )
    }

    /// Whether the subscription is still dispatching callbacks.
    #[must_use]
    pub fn is_active(&self) -> bool { self.active.load(Ordering::SeqCst) }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle").field("active", &self.is_active()).finish()
    }
}

/// A string-keyed settings store shared with the rest of the desktop.
///
/// Individual `set` calls are atomic from the store's perspective, but
/// multi-key sequences are not transactional - concurrent writers follow
/// last-writer-wins per key.
pub trait SettingsStore: Send + Sync {
    /// Reads a string value.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the key is missing, holds a non-string
    /// value, or the backend fails.
    fn get_string(&self, namespace: &Namespace, key: &str) -> Result<String, SettingsError>;

    /// Writes a string value.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the backend rejects the write.
    fn set_string(
        &self,
        namespace: &Namespace,
        key: &str,
        value: &str,
    ) -> Result<(), SettingsError>;

    /// Reads a list of strings.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the key is missing, holds a value of a
    /// different type, or the backend fails.
    fn get_string_list(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Vec<String>, SettingsError>;

    /// Subscribes to changes within a namespace.
    ///
    /// The callback receives the name of each changed key and may run on an
    /// arbitrary thread. The subscription lasts until the returned handle is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Watch`] if the subscription cannot be
    /// established.
    fn watch(
        &self,
        namespace: &Namespace,
        callback: WatchCallback,
    ) -> Result<WatchHandle, SettingsError>;
}

/// A registered change subscription, shared by the backends.
pub(crate) struct Subscription {
    namespace: String,
    active: Arc<AtomicBool>,
    callback: WatchCallback,
}

impl Subscription {
    pub(crate) fn new(namespace: String, active: Arc<AtomicBool>, callback: WatchCallback) -> Self {
        Self { namespace, active, callback }
    }

    /// Dispatches a change if the subscription matches and is still live.
    /// Returns `false` once the owning handle has been dropped.
    pub(crate) fn notify(&self, namespace: &str, key: &str) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        if self.namespace == namespace {
            (self.callback)(key);
        }
        true
    }
}
