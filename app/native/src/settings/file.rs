//! JSON-file settings store.
//!
//! Stores the whole settings tree as one JSON document, keyed by namespace
//! address. External edits to the file are picked up with a filesystem
//! watcher and turned into per-key change notifications, which lets the
//! daemon run end-to-end on machines without a MATE session.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use super::{Namespace, SettingsError, SettingsStore, Subscription, WatchCallback, WatchHandle};
use crate::utils::thread::spawn_named;

/// Debounce window for file change events.
/// Some editors trigger multiple events per save (write to temp, rename, etc.).
const WATCH_DEBOUNCE_MS: u64 = 200;

type Document = Map<String, Value>;

/// A settings store backed by a JSON file on disk.
pub struct FileStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.inner.path).finish_non_exhaustive()
    }
}

struct Inner {
    path: PathBuf,
    file_name: OsString,
    data: RwLock<Document>,
    subscriptions: Mutex<Vec<Subscription>>,
    watcher_started: AtomicBool,
}

impl FileStore {
    /// Opens a store at `path`, reading the document if the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Backend`] if the file exists but cannot be
    /// read or does not contain a JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let data = if path.exists() { read_document(&path)? } else { Document::new() };
        let file_name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                file_name,
                data: RwLock::new(data),
                subscriptions: Mutex::new(Vec::new()),
                watcher_started: AtomicBool::new(false),
            }),
        })
    }

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.inner.path }

    /// Seeds a string list, persisting and notifying watchers.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Write`] if the document cannot be persisted.
    pub fn set_string_list(
        &self,
        namespace: &Namespace,
        key: &str,
        values: &[&str],
    ) -> Result<(), SettingsError> {
        let items = values.iter().map(|v| Value::String((*v).to_string())).collect();
        self.inner.set_value(&namespace.address(), key, Value::Array(items))
    }

    /// Starts the filesystem watcher thread on first subscription.
    fn start_watcher(&self) {
        if self.inner.watcher_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        spawn_named("settings-watch", move || watch_loop(&inner));
    }
}

impl SettingsStore for FileStore {
    fn get_string(&self, namespace: &Namespace, key: &str) -> Result<String, SettingsError> {
        let address = namespace.address();
        match self.inner.get_value(&address, key) {
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(SettingsError::WrongType {
                namespace: address,
                key: key.to_string(),
                expected: "string",
            }),
            None => Err(SettingsError::KeyNotFound { namespace: address, key: key.to_string() }),
        }
    }

    fn set_string(
        &self,
        namespace: &Namespace,
        key: &str,
        value: &str,
    ) -> Result<(), SettingsError> {
        self.inner
            .set_value(&namespace.address(), key, Value::String(value.to_string()))
    }

    fn get_string_list(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Vec<String>, SettingsError> {
        let address = namespace.address();
        let wrong_type = || SettingsError::WrongType {
            namespace: address.clone(),
            key: key.to_string(),
            expected: "string list",
        };

        match self.inner.get_value(&address, key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(ToString::to_string).ok_or_else(&wrong_type))
                .collect(),
            Some(_) => Err(wrong_type()),
            None => Err(SettingsError::KeyNotFound {
                namespace: address.clone(),
                key: key.to_string(),
            }),
        }
    }

    fn watch(
        &self,
        namespace: &Namespace,
        callback: WatchCallback,
    ) -> Result<WatchHandle, SettingsError> {
        let (handle, active) = WatchHandle::new();
        self.inner
            .subscriptions
            .lock()
            .push(Subscription::new(namespace.address(), active, callback));
        self.start_watcher();
        Ok(handle)
    }
}

impl Inner {
    fn get_value(&self, address: &str, key: &str) -> Option<Value> {
        self.data.read().get(address)?.as_object()?.get(key).cloned()
    }

    fn set_value(&self, address: &str, key: &str, value: Value) -> Result<(), SettingsError> {
        {
            let mut data = self.data.write();
            let entry = data
                .entry(address.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Some(object) = entry.as_object_mut() else {
                return Err(SettingsError::Backend(format!(
                    "namespace '{address}' is not an object in {}",
                    self.path.display()
                )));
            };
            object.insert(key.to_string(), value);
            self.persist(&data)?;
        }
        self.dispatch(address, key);
        Ok(())
    }

    fn persist(&self, data: &Document) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|err| SettingsError::Write(err.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|err| SettingsError::Write(format!("{}: {err}", parent.display())))?;
        }

        fs::write(&self.path, json)
            .map_err(|err| SettingsError::Write(format!("{}: {err}", self.path.display())))
    }

    fn dispatch(&self, namespace: &str, key: &str) {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.retain(|sub| sub.notify(namespace, key));
    }

    /// Re-reads the document after an external edit and notifies watchers of
    /// every key whose value changed.
    fn reload_and_notify(&self) {
        let new_data = match read_document(&self.path) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(error = %err, "failed to reload settings file");
                return;
            }
        };

        let changed = {
            let mut data = self.data.write();
            let changed = diff_documents(&data, &new_data);
            *data = new_data;
            changed
        };

        for (namespace, key) in changed {
            self.dispatch(&namespace, &key);
        }
    }
}

fn read_document(path: &Path) -> Result<Document, SettingsError> {
    let contents = fs::read_to_string(path)
        .map_err(|err| SettingsError::Backend(format!("failed to read {}: {err}", path.display())))?;

    if contents.trim().is_empty() {
        return Ok(Document::new());
    }

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SettingsError::Backend(format!(
            "{} does not contain a JSON object",
            path.display()
        ))),
        Err(err) => Err(SettingsError::Backend(format!(
            "failed to parse {}: {err}",
            path.display()
        ))),
    }
}

/// Returns the `(namespace, key)` pairs whose values differ between two
/// documents, including keys present on only one side.
fn diff_documents(old: &Document, new: &Document) -> Vec<(String, String)> {
    let empty = Map::new();
    let mut changed = Vec::new();

    let namespaces: std::collections::BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for namespace in namespaces {
        let old_keys = old.get(namespace).and_then(Value::as_object).unwrap_or(&empty);
        let new_keys = new.get(namespace).and_then(Value::as_object).unwrap_or(&empty);

        let keys: std::collections::BTreeSet<&String> =
            old_keys.keys().chain(new_keys.keys()).collect();
        for key in keys {
            if old_keys.get(key) != new_keys.get(key) {
                changed.push((namespace.clone(), key.clone()));
            }
        }
    }

    changed
}

fn watch_loop(inner: &Arc<Inner>) {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = match notify::recommended_watcher(tx) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(error = %err, "failed to create settings file watcher");
            return;
        }
    };

    // Watch the parent directory to catch file replacements
    // (some editors save by writing to a temp file then renaming)
    let watch_path = inner
        .path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    if let Err(err) = watcher.watch(watch_path, RecursiveMode::NonRecursive) {
        tracing::warn!(error = %err, path = %watch_path.display(), "failed to watch settings file");
        return;
    }

    let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
    let mut last_reload: Option<Instant> = None;

    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                let affects_file = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|name| name == inner.file_name.as_os_str()));
                if !affects_file {
                    continue;
                }

                let now = Instant::now();
                if last_reload.is_some_and(|t| now.duration_since(t) < debounce) {
                    continue;
                }
                last_reload = Some(now);

                inner.reload_and_notify();
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "settings file watch error");
            }
            Err(_) => {
                // Channel closed, watcher dropped
                break;
            }
        }
    }
}
