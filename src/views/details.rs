//! C5b: Details — one run rendered as structured fields with a selectable
//! row cursor, copy/open actions, status history, and live polling while
//! the run is Active.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::app::{AppContext, ViewOutcome};
use crate::cache::now_unix;
use crate::layout::{Severity, StatusLine, WindowLayout};
use crate::model::{Run, RunId};
use crate::navigation::NavMsg;
use crate::poller::PollEvent;
use crate::task::BackgroundJob;
use crate::views::{human_age, timestamp_hms};

struct Field {
    label: &'static str,
    value: String,
}

pub struct DetailsView {
    run_id: RunId,
    run: Option<Run>,
    fields: Vec<Field>,
    selected: usize,
    loading: bool,
    polling_status: bool,
    status_history: Vec<String>,
    status: StatusLine,
    pending_fetch: Option<BackgroundJob<Result<Run, String>>>,
}

impl DetailsView {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            run: None,
            fields: Vec::new(),
            selected: 0,
            loading: false,
            polling_status: false,
            status_history: Vec::new(),
            status: StatusLine::new("DETAILS", "j/k:move  y:copy field  Y:copy all  o:open  r:refresh  q/Esc:back  Q:quit"),
            pending_fetch: None,
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Advances the status-line spinner and applies a finished background
    /// fetch, if any; a no-op frame-over-frame otherwise.
    pub fn tick(&mut self, ctx: &AppContext) {
        if self.loading {
            self.status.tick_spinner();
        }
        if let Some(job) = &self.pending_fetch {
            if let Some(result) = job.poll() {
                self.pending_fetch = None;
                match result {
                    Ok(run) => {
                        ctx.cache.set_run(run.clone());
                        self.apply_run(run);
                    }
                    Err(e) => {
                        self.loading = false;
                        self.status.show_message(&format!("✗ {e}"), Severity::Error, Duration::from_secs(2));
                    }
                }
            }
        }
    }

    /// Spawns the GetRun call on a background thread; never blocks the
    /// render/input thread.
    fn spawn_fetch(&mut self, ctx: &AppContext) {
        let client = Arc::clone(&ctx.client);
        let run_id = self.run_id.clone();
        self.pending_fetch = Some(BackgroundJob::spawn(move || -> Result<Run, String> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| format!("runtime init failed: {e}"))?;
            rt.block_on(client.get_run(&run_id))
        }));
    }

    pub fn apply_run(&mut self, run: Run) {
        self.record_status(&run);
        self.fields = build_fields(&run);
        self.selected = self.selected.min(self.fields.len().saturating_sub(1));
        self.loading = false;
        self.polling_status = false;
        self.run = Some(run);
    }

    fn record_status(&mut self, run: &Run) {
        let label = format!("[{}] {} {}", timestamp_hms(now_unix()), run.status.icon(), run.status.as_str());
        let is_dup = self
            .status_history
            .last()
            .map(|last| last.ends_with(run.status.as_str()))
            .unwrap_or(false);
        if !is_dup {
            self.status_history.push(label);
        }
    }

    /// Applies a poll result and, if the run just transitioned into a
    /// terminal status, returns `(title, status_icon, status_label)` for the
    /// caller to surface as a bell/notification.
    pub fn apply_poll_event(&mut self, event: PollEvent) -> Option<(String, &'static str, String)> {
        match event {
            PollEvent::Updated(run) => {
                let was_terminal = self.run.as_ref().map(|r| r.status.is_terminal()).unwrap_or(false);
                let became_terminal = run.status.is_terminal() && !was_terminal;
                let alert = became_terminal.then(|| (run.title.clone(), run.status.icon(), run.status.as_str().to_string()));
                self.apply_run(run);
                alert
            }
            PollEvent::Error(_e) => {
                self.polling_status = false;
                None
            }
        }
    }

    pub fn run_is_terminal(&self) -> bool {
        self.run.as_ref().map(|r| r.status.is_terminal()).unwrap_or(false)
    }

    pub fn handle_key(&mut self, code: KeyCode, _mods: KeyModifiers, ctx: &mut AppContext) -> ViewOutcome {
        if self.run.is_none() && !self.loading && self.pending_fetch.is_none() {
            if let Some(run) = ctx.cache.get_run(&self.run_id) {
                self.apply_run(run);
            } else {
                self.loading = true;
                self.spawn_fetch(ctx);
            }
        }

        match code {
            KeyCode::Char('Q') => ViewOutcome::Quit,
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.fields.is_empty() {
                    self.selected = (self.selected + 1) % self.fields.len();
                }
                ViewOutcome::None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if !self.fields.is_empty() {
                    self.selected = if self.selected == 0 { self.fields.len() - 1 } else { self.selected - 1 };
                }
                ViewOutcome::None
            }
            KeyCode::Char('g') => {
                self.selected = 0;
                ViewOutcome::None
            }
            KeyCode::Char('G') => {
                self.selected = self.fields.len().saturating_sub(1);
                ViewOutcome::None
            }
            KeyCode::Char('y') => {
                if let Some(field) = self.fields.get(self.selected) {
                    ctx.clipboard.copy(&field.value);
                    if ctx.clipboard.last_copy_failed() {
                        self.status.show_message("✗ Failed to copy", Severity::Error, Duration::from_secs(2));
                    } else {
                        self.status.show_message(&format!("📋 Copied {}", field.label), Severity::Info, Duration::from_millis(800));
                    }
                }
                ViewOutcome::None
            }
            KeyCode::Char('Y') => {
                let all: String = self.fields.iter().map(|f| format!("{}: {}\n", f.label, f.value)).collect();
                ctx.clipboard.copy(&all);
                if ctx.clipboard.last_copy_failed() {
                    self.status.show_message("✗ Failed to copy", Severity::Error, Duration::from_secs(2));
                } else {
                    self.status.show_message("📋 Copied all fields", Severity::Info, Duration::from_millis(800));
                }
                ViewOutcome::None
            }
            KeyCode::Char('o') => {
                if let Some(field) = self.fields.get(self.selected) {
                    if field.value.starts_with("http://") || field.value.starts_with("https://") {
                        let _ = open_url(&field.value);
                    }
                }
                ViewOutcome::None
            }
            KeyCode::Char('r') => {
                self.loading = true;
                self.spawn_fetch(ctx);
                ViewOutcome::None
            }
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Backspace => {
                ViewOutcome::Nav(NavMsg::Back)
            }
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
        frame.render_widget(WindowLayout::bordered_box(" Details "), layout.outer_area());

        if self.loading {
            let content = layout.content_area();
            frame.render_widget(Paragraph::new("Loading…").alignment(ratatui::layout::Alignment::Center), content);
        } else {
            let blink = ctx.clipboard.should_highlight();
            let content = layout.content_area();
            let cols = ratatui::layout::Layout::default()
                .direction(ratatui::layout::Direction::Horizontal)
                .constraints([ratatui::layout::Constraint::Percentage(65), ratatui::layout::Constraint::Percentage(35)])
                .split(content);

            let items: Vec<ListItem> = self
                .fields
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    let style = if i == self.selected && blink {
                        Style::default().bg(Color::Green).fg(Color::Black).add_modifier(Modifier::BOLD)
                    } else if i == self.selected {
                        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(format!("{}: {}", f.label, f.value)).style(style)
                })
                .collect();
            frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("Fields")), cols[0]);

            let history: Vec<ListItem> = self.status_history.iter().rev().take(20).map(|h| ListItem::new(h.clone())).collect();
            frame.render_widget(List::new(history).block(Block::default().borders(Borders::ALL).title("History")), cols[1]);
        }

        let right = if self.polling_status { "Fetching…" } else { "" };
        let line = self.status.render(Some(right), self.loading);
        frame.render_widget(Paragraph::new(line), layout.status_line_area());
    }
}

fn build_fields(run: &Run) -> Vec<Field> {
    let mut fields = vec![
        Field { label: "Run ID", value: run.id.clone() },
        Field { label: "Title", value: run.title.clone() },
        Field { label: "Repository", value: run.repository.clone() },
        Field { label: "Status", value: run.status.as_str().to_string() },
        Field { label: "Type", value: run.run_type.as_str().to_string() },
        Field { label: "Source", value: run.source.clone() },
        Field { label: "Target", value: run.target.clone() },
        Field { label: "Updated", value: human_age(now_unix(), run.updated_at) },
        Field { label: "Prompt", value: run.prompt.clone() },
    ];
    if !run.context.is_empty() {
        fields.push(Field { label: "Context", value: run.context.clone() });
    }
    if !run.plan.is_empty() {
        fields.push(Field { label: "Plan", value: run.plan.clone() });
    }
    if !run.error.is_empty() {
        fields.push(Field { label: "Error", value: run.error.clone() });
    }
    if let Some(url) = &run.pr_url {
        fields.push(Field { label: "PR", value: url.clone() });
    }
    fields
}

fn open_url(url: &str) -> Result<(), String> {
    #[cfg(target_os = "macos")]
    let mut cmd = std::process::Command::new("open");
    #[cfg(target_os = "linux")]
    let mut cmd = std::process::Command::new("xdg-open");
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
        return Err("no known browser launcher for this platform".to_string());
    }
    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
    {
        cmd.arg(url);
        cmd.spawn().map_err(|e| format!("failed to open browser: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunStatus, RunType};

    fn sample() -> Run {
        Run {
            id: "R".to_string(),
            title: "X".to_string(),
            description: String::new(),
            repository: "acme/backend".to_string(),
            repo_id: None,
            source: "main".to_string(),
            target: "repobird/run".to_string(),
            run_type: RunType::Run,
            status: RunStatus::Done,
            prompt: "do it".to_string(),
            context: String::new(),
            plan: String::new(),
            error: String::new(),
            pr_url: None,
            trigger_source: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn cache_hit_populates_fields_and_history() {
        let mut view = DetailsView::new("R".to_string());
        view.apply_run(sample());
        assert!(!view.loading);
        assert_eq!(view.status_history.len(), 1);
        assert!(view.fields.iter().any(|f| f.label == "Title" && f.value == "X"));
    }

    #[test]
    fn duplicate_consecutive_status_is_elided() {
        let mut view = DetailsView::new("R".to_string());
        view.apply_run(sample());
        view.apply_run(sample());
        assert_eq!(view.status_history.len(), 1);
    }

    #[test]
    fn stops_polling_on_terminal_status() {
        let mut view = DetailsView::new("R".to_string());
        view.apply_poll_event(PollEvent::Updated(sample()));
        assert!(view.run_is_terminal());
    }
}
