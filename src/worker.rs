use crate::error::BridgeError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Spawn a named worker whose body cannot unwind into the host. A panic is
/// logged and the thread simply ends.
pub(crate) fn spawn_contained<F>(name: &'static str, body: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                let panic_message = if let Some(message) = payload.downcast_ref::<&str>() {
                    (*message).to_string()
                } else if let Some(message) = payload.downcast_ref::<String>() {
                    message.clone()
                } else {
                    "unknown panic payload".to_string()
                };
                tracing::error!(worker = name, panic_message, "worker panicked");
            }
        })
}

/// Wait for `handle` to finish, giving up after `timeout`. On timeout the
/// thread is left detached; it holds only `Arc`s so nothing it touches is
/// freed underneath it.
pub(crate) fn join_with_timeout(
    handle: JoinHandle<()>,
    worker: &'static str,
    timeout: Duration,
) -> Result<(), BridgeError> {
    let (done_tx, done_rx) = mpsc::channel();
    let waiter = thread::spawn(move || {
        let join_result = handle.join();
        let _ = done_tx.send(join_result);
    });

    match done_rx.recv_timeout(timeout) {
        Ok(Ok(())) => {
            let _ = waiter.join();
            tracing::debug!(worker, "worker exited");
            Ok(())
        }
        Ok(Err(_)) => {
            let _ = waiter.join();
            tracing::error!(worker, "worker panicked while joining");
            Ok(())
        }
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
            tracing::error!(worker, ?timeout, "worker join timed out");
            Err(BridgeError::ShutdownTimeout {
                worker,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn panicking_worker_is_contained() {
        let handle = spawn_contained("test-panic", || panic!("boom")).unwrap();
        assert!(join_with_timeout(handle, "test-panic", Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn slow_worker_reports_timeout() {
        let release = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&release);
        let handle = spawn_contained("test-slow", move || {
            while !flag.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
        })
        .unwrap();

        let err = join_with_timeout(handle, "test-slow", Duration::from_millis(30)).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ShutdownTimeout {
                worker: "test-slow",
                ..
            }
        ));
        release.store(true, Ordering::SeqCst);
    }
}
