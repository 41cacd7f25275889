//! C3: clipboard manager. Writes to the OS clipboard and orchestrates the
//! "yank blink" — a short visual flash confirming the copy, checked by
//! every view's render function rather than pushed to them.

use std::time::{Duration, Instant};

const DEFAULT_BLINK: Duration = Duration::from_millis(100);

pub struct ClipboardManager {
    clipboard: Option<arboard::Clipboard>,
    blink_until: Option<Instant>,
    blink_duration: Duration,
    last_copy_failed: bool,
}

impl ClipboardManager {
    pub fn new() -> Self {
        Self {
            clipboard: arboard::Clipboard::new().ok(),
            blink_until: None,
            blink_duration: DEFAULT_BLINK,
            last_copy_failed: false,
        }
    }

    #[cfg(test)]
    fn with_blink_duration(duration: Duration) -> Self {
        Self {
            clipboard: None,
            blink_until: None,
            blink_duration: duration,
            last_copy_failed: false,
        }
    }

    /// Writes `text` to the OS clipboard and starts one blink cycle.
    /// Returns `false` (and records the failure for §7's "✗ Failed to
    /// copy" status-line message) when the clipboard is unavailable.
    pub fn copy(&mut self, text: &str) -> bool {
        let ok = match self.clipboard.as_mut() {
            Some(cb) => cb.set_text(text.to_string()).is_ok(),
            None => false,
        };
        self.last_copy_failed = !ok;
        if ok {
            self.blink_until = Some(Instant::now() + self.blink_duration);
        }
        ok
    }

    /// True for the duration of one blink cycle after a successful copy.
    /// Rendering uses this to paint the affected row with the attention
    /// colour (bright green on black) instead of the normal selection
    /// style.
    pub fn should_highlight(&mut self) -> bool {
        match self.blink_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                self.blink_until = None;
                false
            }
            None => false,
        }
    }

    pub fn last_copy_failed(&self) -> bool {
        self.last_copy_failed
    }
}

impl Default for ClipboardManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_clears_after_duration_elapses() {
        let mut mgr = ClipboardManager::with_blink_duration(Duration::from_millis(5));
        // No clipboard backend in the test harness, so copy() reports
        // failure, but the blink state machine is independent of that and
        // is what this test exercises.
        mgr.blink_until = Some(Instant::now() + Duration::from_millis(5));
        assert!(mgr.should_highlight());
        std::thread::sleep(Duration::from_millis(10));
        assert!(!mgr.should_highlight());
        // Second call after expiry stays false (idempotent).
        assert!(!mgr.should_highlight());
    }

    #[test]
    fn copy_without_backend_reports_failure() {
        let mut mgr = ClipboardManager::with_blink_duration(Duration::from_millis(100));
        let ok = mgr.copy("hello");
        assert!(!ok);
        assert!(mgr.last_copy_failed());
    }
}
