//! C5: the six view state machines. Each view owns its state exclusively,
//! renders as a pure function of that state, and only ever talks to its
//! neighbours through a `ViewOutcome` handed back to `app::App`.

pub mod bulk;
pub mod create;
pub mod dashboard;
pub mod details;
pub mod help;
pub mod status;

pub(crate) fn human_age(now: i64, then: i64) -> String {
    let d = (now - then).max(0);
    if d < 60 {
        "now".to_string()
    } else if d < 3600 {
        format!("{}m ago", d / 60)
    } else if d < 86400 {
        format!("{}h ago", d / 3600)
    } else {
        format!("{}d ago", d / 86400)
    }
}

pub(crate) fn timestamp_hms(unix: i64) -> String {
    let secs_of_day = unix.rem_euclid(86400);
    format!("{:02}:{:02}:{:02}", secs_of_day / 3600, (secs_of_day % 3600) / 60, secs_of_day % 60)
}
