//! C5e: Status — identity, tier, usage percentages, run counters, API
//! endpoint, and connection status as a scrollable key/value grid.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{AppContext, ViewOutcome};
use crate::components::scrollable_list::ScrollableList;
use crate::layout::WindowLayout;
use crate::model::{Run, RunStatus, UserInfo};
use crate::navigation::NavMsg;
use crate::task::BackgroundJob;

const HSCROLL_STEP: usize = 4;
const KEY_COL_WIDTH: usize = 16;
/// `r`'s refresh fetches a capped page of runs purely to compute the
/// run-counter rows; it is not meant to replace Dashboard's own list.
const STATS_RUN_CAP: u32 = 200;

type FetchResult = (Result<UserInfo, String>, Result<Vec<Run>, String>);

/// Slices a string to the display columns in `[offset, offset + max_width)`,
/// skipping whole chars that fall before `offset` and trimming with an
/// ellipsis when the remainder still overflows `max_width`.
fn scroll_window(s: &str, offset: usize, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let total = UnicodeWidthStr::width(s);
    if total <= offset {
        return String::new();
    }

    let mut skipped = 0usize;
    let mut start = 0usize;
    for (idx, ch) in s.char_indices() {
        if skipped >= offset {
            start = idx;
            break;
        }
        skipped += UnicodeWidthChar::width(ch).unwrap_or(0);
        start = idx + ch.len_utf8();
    }
    let rest = &s[start..];

    if UnicodeWidthStr::width(rest) <= max_width {
        return rest.to_string();
    }

    let mut out = String::new();
    let mut w = 0usize;
    for ch in rest.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w + cw > max_width {
            break;
        }
        out.push(ch);
        w += cw;
    }
    while !out.is_empty() && UnicodeWidthStr::width(out.as_str()) + 1 > max_width {
        out.pop();
    }
    if max_width >= 1 {
        out.push('…');
    }
    out
}

fn usage_icon(remaining: u32, total: u32, is_enterprise: bool) -> &'static str {
    if is_enterprise {
        return "♾️";
    }
    if total == 0 {
        return "✅";
    }
    let used_ratio = 1.0 - (remaining as f64 / total as f64);
    if used_ratio >= 0.90 {
        "⚠️"
    } else if used_ratio >= 0.75 {
        "⚡"
    } else {
        "✅"
    }
}

fn count_by_status(runs: &[Run]) -> (usize, usize, usize) {
    let running = runs.iter().filter(|r| r.status.is_active()).count();
    let completed = runs.iter().filter(|r| r.status == RunStatus::Done).count();
    let failed = runs.iter().filter(|r| matches!(r.status, RunStatus::Failed | RunStatus::Cancelled)).count();
    (running, completed, failed)
}

pub struct StatusView {
    user: Option<UserInfo>,
    endpoint: String,
    rows: Vec<(String, String)>,
    list: ScrollableList,
    error: Option<String>,
    loaded: bool,
    hscroll: usize,
    connected: bool,
    pending_fetch: Option<BackgroundJob<FetchResult>>,
}

impl StatusView {
    pub fn new() -> Self {
        Self {
            user: None,
            endpoint: String::new(),
            rows: Vec::new(),
            list: ScrollableList::new(0),
            error: None,
            loaded: false,
            hscroll: 0,
            connected: false,
            pending_fetch: None,
        }
    }

    fn max_value_width(&self) -> usize {
        self.rows.iter().map(|(_, v)| UnicodeWidthStr::width(v.as_str())).max().unwrap_or(0)
    }

    /// Non-blocking: polls the in-flight fetch, if any.
    pub fn tick(&mut self, _ctx: &AppContext) {
        let Some(job) = &self.pending_fetch else {
            return;
        };
        let Some((user_result, runs_result)) = job.poll() else {
            return;
        };
        self.pending_fetch = None;
        let runs = runs_result.unwrap_or_default();
        match user_result {
            Ok(user) => {
                self.connected = true;
                self.error = None;
                self.apply_user(user, &runs);
            }
            Err(e) => {
                self.connected = false;
                self.error = Some(e);
            }
        }
    }

    /// Kicks off GetUserInfo + a capped ListRuns on a background thread.
    fn spawn_fetch(&mut self, ctx: &AppContext) {
        self.endpoint = ctx.client.get_api_endpoint().to_string();
        let client = Arc::clone(&ctx.client);
        self.pending_fetch = Some(BackgroundJob::spawn(move || -> FetchResult {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    let err = format!("runtime init failed: {e}");
                    return (Err(err.clone()), Err(err));
                }
            };
            let user = rt.block_on(client.get_user_info());
            let runs = rt.block_on(client.list_runs(1, STATS_RUN_CAP));
            (user, runs)
        }));
    }

    fn refresh(&mut self, ctx: &AppContext) {
        self.endpoint = ctx.client.get_api_endpoint().to_string();
        if let Some(user) = ctx.cache.get_user_info() {
            let (runs, _stale, _details) = ctx.cache.get_cached_list();
            self.connected = true;
            self.apply_user(user, &runs);
        }
        self.spawn_fetch(ctx);
    }

    fn apply_user(&mut self, user: UserInfo, runs: &[Run]) {
        let is_ent = user.is_enterprise();
        let pro_icon = usage_icon(user.pro_remaining, user.pro_total, is_ent);
        let plan_icon = usage_icon(user.plan_remaining, user.plan_total, is_ent);
        let (running, completed, failed) = count_by_status(runs);
        let connection = if self.connected { "✅ Connected" } else { "✗ Disconnected" };
        self.rows = vec![
            ("Username".to_string(), user.username.clone()),
            ("Tier".to_string(), user.tier.clone()),
            ("Pro runs".to_string(), format!("{pro_icon} {}/{}", user.pro_remaining, user.pro_total)),
            ("Plan runs".to_string(), format!("{plan_icon} {}/{}", user.plan_remaining, user.plan_total)),
            ("Running".to_string(), running.to_string()),
            ("Completed".to_string(), completed.to_string()),
            ("Failed".to_string(), failed.to_string()),
            ("API endpoint".to_string(), self.endpoint.clone()),
            ("Connection".to_string(), connection.to_string()),
        ];
        self.list.set_len(self.rows.len());
        self.hscroll = 0;
        self.user = Some(user);
    }

    pub fn handle_key(&mut self, code: KeyCode, _mods: KeyModifiers, ctx: &mut AppContext) -> ViewOutcome {
        if !self.loaded {
            self.loaded = true;
            self.refresh(ctx);
        }
        match code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.list.move_down();
                ViewOutcome::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.list.move_up();
                ViewOutcome::None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.hscroll = self.hscroll.saturating_sub(HSCROLL_STEP);
                ViewOutcome::None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let max = self.max_value_width().saturating_sub(1);
                self.hscroll = (self.hscroll + HSCROLL_STEP).min(max);
                ViewOutcome::None
            }
            KeyCode::Char('y') => {
                if let Some((_, value)) = self.rows.get(self.list.selected) {
                    ctx.clipboard.copy(value);
                }
                ViewOutcome::None
            }
            KeyCode::Char('Y') => {
                let all: String = self.rows.iter().map(|(k, v)| format!("{k}: {v}\n")).collect();
                ctx.clipboard.copy(&all);
                ViewOutcome::None
            }
            KeyCode::Char('r') => {
                self.refresh(ctx);
                ViewOutcome::None
            }
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Backspace => ViewOutcome::Nav(NavMsg::Back),
            _ => ViewOutcome::None,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, ctx: &mut AppContext) {
        let size = frame.area();
        let layout = WindowLayout::new(size.width, size.height);
        if !layout.is_valid_dimensions() {
            frame.render_widget(Paragraph::new("window too small"), size);
            return;
        }
        frame.render_widget(WindowLayout::bordered_box(" Status "), layout.outer_area());
        let content = layout.content_area();

        if let Some(err) = &self.error {
            frame.render_widget(Paragraph::new(format!("✗ {err}")).alignment(Alignment::Center), content);
            return;
        }

        let blink = ctx.clipboard.should_highlight();
        let value_width = (content.width as usize).saturating_sub(KEY_COL_WIDTH + 2);
        let row_height = (content.height as usize).max(1);
        self.list.scroll_into_view(row_height);
        let items: Vec<ListItem> = self
            .rows
            .iter()
            .enumerate()
            .skip(self.list.offset)
            .take(row_height)
            .map(|(i, (k, v))| {
                let style = if i == self.list.selected && blink {
                    Style::default().bg(Color::Green).fg(Color::Black).add_modifier(Modifier::BOLD)
                } else if i == self.list.selected {
                    Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let value = scroll_window(v, self.hscroll, value_width);
                ListItem::new(format!("{k:KEY_COL_WIDTH$}{value}")).style(style)
            })
            .collect();
        let title = if self.hscroll > 0 {
            format!("Identity & Usage (scrolled +{})", self.hscroll)
        } else {
            "Identity & Usage".to_string()
        };
        frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title(title)), content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_icon_thresholds() {
        assert_eq!(usage_icon(5, 100, false), "⚠️");
        assert_eq!(usage_icon(20, 100, false), "⚡");
        assert_eq!(usage_icon(50, 100, false), "✅");
        assert_eq!(usage_icon(0, 0, true), "♾️");
    }

    #[test]
    fn scroll_window_skips_and_truncates() {
        let s = "0123456789abcdef";
        assert_eq!(scroll_window(s, 0, 5), "0123…");
        assert_eq!(scroll_window(s, 5, 5), "5678…");
        assert_eq!(scroll_window(s, 100, 5), "");
    }

    #[test]
    fn scroll_window_fits_without_ellipsis() {
        let s = "short";
        assert_eq!(scroll_window(s, 0, 20), "short");
    }

    #[test]
    fn scroll_window_adds_ellipsis_when_truncated() {
        let s = "abcdefghij";
        let windowed = scroll_window(s, 0, 4);
        assert!(windowed.ends_with('…'));
    }

    #[test]
    fn count_by_status_buckets_runs() {
        fn run(status: RunStatus) -> Run {
            Run {
                id: "r".to_string(),
                title: String::new(),
                description: String::new(),
                repository: "acme/widgets".to_string(),
                repo_id: None,
                source: "main".to_string(),
                target: "repobird/run".to_string(),
                run_type: crate::model::RunType::Run,
                status,
                prompt: String::new(),
                context: String::new(),
                plan: String::new(),
                error: String::new(),
                pr_url: None,
                trigger_source: None,
                created_at: 0,
                updated_at: 0,
            }
        }
        let runs = vec![run(RunStatus::Processing), run(RunStatus::Done), run(RunStatus::Failed), run(RunStatus::Cancelled)];
        assert_eq!(count_by_status(&runs), (1, 1, 2));
    }
}
