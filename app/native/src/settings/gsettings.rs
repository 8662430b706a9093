//! `gsettings`-backed settings store.
//!
//! Drives a live MATE session through the `gsettings` command line tool:
//! `get`/`set` for reads and writes, and a long-running `gsettings monitor`
//! child process for change notifications. Values cross the boundary as
//! GVariant text literals, parsed here into plain strings.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;

use super::{Namespace, SettingsError, SettingsStore, WatchCallback, WatchHandle};
use crate::utils::thread::spawn_named;

/// A settings store that shells out to `gsettings`.
pub struct GSettingsStore {
    binary: String,
}

impl Default for GSettingsStore {
    fn default() -> Self { Self::new() }
}

impl GSettingsStore {
    /// Creates a store using the `gsettings` binary from `PATH`.
    #[must_use]
    pub fn new() -> Self { Self { binary: "gsettings".to_string() } }

    /// Creates a store using a specific binary, for tests and sandboxes.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn run(&self, args: &[&str]) -> Result<String, SettingsError> {
        let output = Command::new(&self.binary).args(args).output().map_err(|err| {
            SettingsError::Backend(format!("failed to run {}: {err}", self.binary))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SettingsError::Backend(format!(
                "{} {} failed: {}",
                self.binary,
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl SettingsStore for GSettingsStore {
    fn get_string(&self, namespace: &Namespace, key: &str) -> Result<String, SettingsError> {
        let address = namespace.address();
        let raw = self.run(&["get", &address, key])?;

        parse_string_literal(&raw).ok_or(SettingsError::WrongType {
            namespace: address,
            key: key.to_string(),
            expected: "string",
        })
    }

    fn set_string(
        &self,
        namespace: &Namespace,
        key: &str,
        value: &str,
    ) -> Result<(), SettingsError> {
        self.run(&["set", &namespace.address(), key, value])
            .map(|_| ())
            .map_err(|err| SettingsError::Write(err.to_string()))
    }

    fn get_string_list(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Vec<String>, SettingsError> {
        let address = namespace.address();
        let raw = self.run(&["get", &address, key])?;

        parse_string_list(&raw).ok_or(SettingsError::WrongType {
            namespace: address,
            key: key.to_string(),
            expected: "string list",
        })
    }

    fn watch(
        &self,
        namespace: &Namespace,
        callback: WatchCallback,
    ) -> Result<WatchHandle, SettingsError> {
        let mut child = Command::new(&self.binary)
            .arg("monitor")
            .arg(namespace.address())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                SettingsError::Watch(format!("failed to spawn {} monitor: {err}", self.binary))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SettingsError::Watch("monitor child has no stdout".to_string()))?;

        let child = Arc::new(Mutex::new(child));
        let kill_child = Arc::clone(&child);
        let (handle, active) = WatchHandle::with_cleanup(Box::new(move || {
            let mut child = kill_child.lock();
            let _ = child.kill();
            let _ = child.wait();
        }));

        spawn_named("gsettings-monitor", move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(line) = line else { break };
                if let Some(key) = monitor_line_key(&line) {
                    callback(key);
                }
            }
            // hold the child handle until the stream ends so the monitor
            // process is reaped together with the subscription
            drop(child);
        });

        Ok(handle)
    }
}

/// Extracts the key name from one `gsettings monitor` output line,
/// e.g. `picture-filename: '/home/user/wall.jpg'`.
fn monitor_line_key(line: &str) -> Option<&str> {
    let (key, _) = line.split_once(':')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// Parses a GVariant string literal (`'...'` or `"..."`).
fn parse_string_literal(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let inner = raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .or_else(|| raw.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')))?;
    Some(unescape(inner))
}

/// Parses a GVariant string array literal, e.g. `['top', 'bottom']` or the
/// annotated empty form `@as []`.
fn parse_string_list(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("@as").map_or(raw, str::trim_start);
    let body = raw.strip_prefix('[')?.strip_suffix(']')?.trim();

    if body.is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match quote {
            Some(_) if c == '\\' => escaped = true,
            Some(open) if c == open => {
                quote = None;
                items.push(std::mem::take(&mut current));
            }
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => quote = Some(c),
                ',' | ' ' | '\t' => {}
                _ => return None,
            },
        }
    }

    if quote.is_some() {
        return None;
    }
    Some(items)
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
