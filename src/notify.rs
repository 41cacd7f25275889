//! Cross-platform OS desktop notifications for significant background
//! refresh events. Not named by spec.md, but lifted from the teacher
//! (`needle::notify`, built on `notify-rust`) as a supplemental feature —
//! see SPEC_FULL.md §10.

use notify_rust::Notification;

fn send_simple(title: &str, body: &str) {
    let _ = Notification::new().summary(title).body(body).timeout(5000).show();
}

/// A polled run finished (entered a terminal status) while a Details view
/// had it open in the background.
pub fn notify_run_finished(title: &str, status_icon: &str, status_label: &str) {
    send_simple(
        &format!("{status_icon} Run finished"),
        &format!("{}: {}", truncate(title, 60), status_label),
    );
}

/// A bulk batch completed submission and all results are in.
pub fn notify_bulk_complete(batch_title: &str, count: usize) {
    let body = if count == 1 {
        "1 run submitted".to_string()
    } else {
        format!("{count} runs submitted")
    };
    send_simple(&format!("📦 {batch_title}"), &body);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}…", &s[..max_len.saturating_sub(1)])
    }
}
