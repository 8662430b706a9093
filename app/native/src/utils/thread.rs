use std::thread::{self, JoinHandle};

/// Spawns a named worker thread, returning its handle.
///
/// Returns `None` if the OS refuses to spawn the thread; the failure is
/// logged rather than propagated since callers treat workers as best-effort.
pub fn spawn_named<F>(name: &str, task: F) -> Option<JoinHandle<()>>
where F: FnOnce() + Send + 'static {
    let thread_name = format!("paneltint-{name}");

    match thread::Builder::new().name(thread_name.clone()).spawn(task) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(thread = %thread_name, error = %err, "failed to spawn thread");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    use super::*;

    #[test]
    fn spawn_named_executes_task() {
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = Arc::clone(&executed);

        let handle = spawn_named("test-task", move || {
            executed_clone.store(true, Ordering::SeqCst);
        })
        .unwrap();

        handle.join().unwrap();
        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn spawn_named_uses_correct_prefix() {
        let (tx, rx) = channel();

        spawn_named("name-test", move || {
            let current_thread = thread::current();
            let name = current_thread.name().unwrap_or("").to_string();
            tx.send(name).unwrap();
        });

        let thread_name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(thread_name, "paneltint-name-test");
    }

    #[test]
    fn spawn_named_returns_joinable_handle() {
        let handle = spawn_named("join-test", || {
            thread::sleep(Duration::from_millis(10));
        })
        .unwrap();

        assert!(handle.join().is_ok());
    }
}
