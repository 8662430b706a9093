//! In-memory settings store.

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{Namespace, SettingsError, SettingsStore, Subscription, WatchCallback, WatchHandle};

/// A stored value.
#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    List(Vec<String>),
}

/// A process-local settings store.
///
/// Used by tests and by preview tooling that should not touch the real
/// desktop. Watch callbacks are dispatched synchronously on the writing
/// thread.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<(String, String), Entry>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Seeds a string list, notifying watchers of the namespace.
    pub fn set_string_list(&self, namespace: &Namespace, key: &str, values: &[&str]) {
        let address = namespace.address();
        self.entries.insert(
            (address.clone(), key.to_string()),
            Entry::List(values.iter().map(ToString::to_string).collect()),
        );
        self.dispatch(&address, key);
    }

    fn dispatch(&self, namespace: &str, key: &str) {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.retain(|sub| sub.notify(namespace, key));
    }
}

impl SettingsStore for MemoryStore {
    fn get_string(&self, namespace: &Namespace, key: &str) -> Result<String, SettingsError> {
        let address = namespace.address();
        match self.entries.get(&(address.clone(), key.to_string())).map(|entry| entry.value().clone()) {
            Some(Entry::Str(value)) => Ok(value),
            Some(Entry::List(_)) => Err(SettingsError::WrongType {
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
        let address = namespace.address();
        self.entries
            .insert((address.clone(), key.to_string()), Entry::Str(value.to_string()));
        self.dispatch(&address, key);
        Ok(())
    }

    fn get_string_list(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Vec<String>, SettingsError> {
        let address = namespace.address();
        match self.entries.get(&(address.clone(), key.to_string())).map(|entry| entry.value().clone()) {
            Some(Entry::List(values)) => Ok(values),
            Some(Entry::Str(_)) => Err(SettingsError::WrongType {
                namespace: address,
                key: key.to_string(),
                expected: "string list",
            }),
            None => Err(SettingsError::KeyNotFound { namespace: address, key: key.to_string() }),
        }
    }

    fn watch(
        &self,
        namespace: &Namespace,
        callback: WatchCallback,
    ) -> Result<WatchHandle, SettingsError> {
        let (handle, active) = WatchHandle::new();
        self.subscriptions
            .lock()
            .push(Subscription::new(namespace.address(), active, callback));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::settings::keys;

    #[test]
    fn test_get_string_round_trip() {
        let store = MemoryStore::new();
        let ns = keys::background();

        store.set_string(&ns, keys::PICTURE_FILENAME, "/tmp/wall.jpg").unwrap();
        assert_eq!(
            store.get_string(&ns, keys::PICTURE_FILENAME).unwrap(),
            "/tmp/wall.jpg"
        );
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_string(&keys::background(), "nope").unwrap_err();
        assert!(matches!(err, SettingsError::KeyNotFound { .. }));
    }

    #[test]
    fn test_string_list_round_trip() {
        let store = MemoryStore::new();
        let ns = keys::panel();

        store.set_string_list(&ns, keys::TOPLEVEL_ID_LIST, &["top", "bottom"]);
        assert_eq!(
            store.get_string_list(&ns, keys::TOPLEVEL_ID_LIST).unwrap(),
            vec!["top".to_string(), "bottom".to_string()]
        );
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let store = MemoryStore::new();
        let ns = keys::panel();

        store.set_string_list(&ns, keys::TOPLEVEL_ID_LIST, &["top"]);
        let err = store.get_string(&ns, keys::TOPLEVEL_ID_LIST).unwrap_err();
        assert!(matches!(err, SettingsError::WrongType { expected: "string", .. }));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = MemoryStore::new();

        store
            .set_string(&keys::panel_background("top"), keys::BACKGROUND_COLOR, "#000000")
            .unwrap();
        let err = store
            .get_string(&keys::panel_background("bottom"), keys::BACKGROUND_COLOR)
            .unwrap_err();
        assert!(matches!(err, SettingsError::KeyNotFound { .. }));
    }

    #[test]
    fn test_watch_fires_for_matching_namespace_only() {
        let store = MemoryStore::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let _handle = store
            .watch(
                &keys::background(),
                Box::new(move |key| {
                    assert_eq!(key, keys::PICTURE_FILENAME);
                    count_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        store.set_string(&keys::background(), keys::PICTURE_FILENAME, "/a.jpg").unwrap();
        store.set_string(&keys::panel(), "other", "value").unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_watch_stops_after_handle_drop() {
        let store = MemoryStore::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let handle = store
            .watch(
                &keys::background(),
                Box::new(move |_| {
                    count_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        store.set_string(&keys::background(), keys::PICTURE_FILENAME, "/a.jpg").unwrap();
        drop(handle);
        store.set_string(&keys::background(), keys::PICTURE_FILENAME, "/b.jpg").unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
