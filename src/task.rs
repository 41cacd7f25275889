//! C8: one-shot background jobs for view actions that need network I/O
//! without blocking the render/input thread.
//!
//! Generalizes `poller.rs`'s thread+channel pattern (and the teacher's
//! `Arc<dyn Fn>` + `std::thread::spawn` + `mpsc` worker in `tui.rs`) to a
//! single result instead of a repeating stream: `handle_key` calls
//! `spawn`, stashes the returned handle, and each view's `tick` calls
//! `poll` once per frame until it resolves.

use std::sync::mpsc::{channel, Receiver};
use std::thread;

pub struct BackgroundJob<T> {
    rx: Receiver<T>,
}

impl<T: Send + 'static> BackgroundJob<T> {
    /// Runs `job` on its own thread; `job` is responsible for building
    /// whatever ad hoc tokio runtime it needs and blocking on it there,
    /// never on the caller's thread.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = channel();
        thread::spawn(move || {
            let _ = tx.send(job());
        });
        Self { rx }
    }

    /// Non-blocking poll. Returns the result once the job finishes;
    /// callers should drop the `BackgroundJob` after the first `Some`.
    pub fn poll(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn resolves_once_thread_completes() {
        let job: BackgroundJob<i32> = BackgroundJob::spawn(|| 1 + 1);
        let mut result = None;
        for _ in 0..200 {
            if let Some(v) = job.poll() {
                result = Some(v);
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(result, Some(2));
    }
}
