//! C5d: Bulk — load one or more configuration files describing many runs,
//! review/toggle selection, submit as a batch, then show results.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Direction, Layout as RatLayout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::app::{AppContext, ViewOutcome};
use crate::client::{CreateBulkRunsRequest, CreateRunRequest, RepoBirdClient};
use crate::components::file_selector::FileSelector;
use crate::config_file::parse_bulk_config;
use crate::layout::WindowLayout;
use crate::model::{BulkBatch, BulkRunItem, RunType};
use crate::navigation::NavMsg;
use crate::task::BackgroundJob;

const EDIT_FIELD_COUNT: usize = 5;

struct ExampleConfig {
    name: &'static str,
    batch_title: &'static str,
    items: &'static [(&'static str, &'static str)],
}

const EXAMPLES: &[ExampleConfig] = &[
    ExampleConfig {
        name: "Add README badges",
        batch_title: "docs: badges",
        items: &[
            ("Add CI badge", "Add a GitHub Actions CI badge to the top of README.md"),
            ("Add license badge", "Add a license badge next to the CI badge in README.md"),
        ],
    },
    ExampleConfig {
        name: "Dependency bumps",
        batch_title: "chore: bump deps",
        items: &[
            ("Bump serde", "Bump serde to the latest 1.x release and fix any breakage"),
            ("Bump tokio", "Bump tokio to the latest 1.x release and fix any breakage"),
        ],
    },
    ExampleConfig {
        name: "Test coverage sweep",
        batch_title: "test: coverage",
        items: &[
            ("Add cache tests", "Add unit tests covering cache eviction and merge semantics"),
            ("Add client tests", "Add unit tests covering client error paths"),
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Instructions,
    FileBrowser,
    Examples,
    RunList,
    RunEdit,
    Progress,
    Results,
}

enum ProgressEvent {
    Updated(BulkBatch),
    Error(String),
}

/// Background poller for an in-flight bulk batch, mirroring the Details
/// view's `Poller` but against `poll_bulk_status` instead of `get_run`.
struct ProgressPoller {
    stop_flag: Arc<AtomicBool>,
    rx: Receiver<ProgressEvent>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressPoller {
    fn spawn(client: Arc<RepoBirdClient>, batch_id: String, tick_interval: Duration) -> Self {
        let (tx, rx) = channel();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_thread = Arc::clone(&stop_flag);
        let handle = thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(ProgressEvent::Error(format!("poller runtime init failed: {e}")));
                    return;
                }
            };
            loop {
                if stop_flag_thread.load(Ordering::Relaxed) {
                    return;
                }
                match rt.block_on(client.poll_bulk_status(&batch_id)) {
                    Ok(batch) => {
                        let terminal = batch.items.iter().all(|i| i.status.map(|s| s.is_terminal()).unwrap_or(true));
                        if tx.send(ProgressEvent::Updated(batch)).is_err() {
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                    Err(e) => {
                        if tx.send(ProgressEvent::Error(e)).is_err() {
                            return;
                        }
                    }
                }
                for _ in 0..(tick_interval.as_millis() / 100) {
                    if stop_flag_thread.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(Duration::from_millis(100));
                }
            }
        });
        Self {
            stop_flag,
            rx,
            handle: Some(handle),
        }
    }

    fn drain(&self) -> Vec<ProgressEvent> {
        self.rx.try_iter().collect()
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct BulkView {
    mode: Mode,
    file_selector: Option<FileSelector>,
    repository_name: String,
    source_branch: String,
    run_type: RunType,
    batch_title: String,
    items: Vec<BulkRunItem>,
    selected: usize,
    batch: Option<BulkBatch>,
    error: Option<String>,
    edit_field: usize,
    example_selected: usize,
    pending_submit: Option<BackgroundJob<Result<BulkBatch, String>>>,
    pending_cancel: Option<BackgroundJob<Result<(), String>>>,
    progress: Option<ProgressPoller>,
}

impl BulkView {
    pub fn new() -> Self {
        Self {
            mode: Mode::Instructions,
            file_selector: None,
            repository_name: String::new(),
            source_branch: "main".to_string(),
            run_type: RunType::Run,
            batch_title: "bulk run".to_string(),
            items: Vec::new(),
            selected: 0,
            batch: None,
            error: None,
            edit_field: 0,
            example_selected: 0,
            pending_submit: None,
            pending_cancel: None,
            progress: None,
        }
    }

    /// Polls the in-flight submit/cancel job and the progress poller, if
    /// any. Never blocks: all network calls run on their own threads.
    pub fn tick(&mut self, ctx: &AppContext) {
        if let Some(job) = &self.pending_submit {
            if let Some(result) = job.poll() {
                self.pending_submit = None;
                match result {
                    Ok(batch) => {
                        self.items = batch.items.clone();
                        let batch_id = batch.batch_id.clone();
                        self.batch = Some(batch);
                        self.progress = Some(ProgressPoller::spawn(Arc::clone(&ctx.client), batch_id, ctx.poll_tick_interval));
                    }
                    Err(e) => {
                        self.error = Some(e);
                        self.mode = Mode::RunList;
                    }
                }
            }
        }

        if let Some(job) = &self.pending_cancel {
            if let Some(_result) = job.poll() {
                self.pending_cancel = None;
                self.progress = None;
                self.mode = Mode::RunList;
            }
        }

        if let Some(poller) = &self.progress {
            let mut became_terminal = false;
            for event in poller.drain() {
                match event {
                    ProgressEvent::Updated(batch) => {
                        let count = batch.items.len();
                        let terminal = batch.items.iter().all(|i| i.status.map(|s| s.is_terminal()).unwrap_or(true));
                        self.items = batch.items.clone();
                        self.batch = Some(batch);
                        if terminal {
                            became_terminal = true;
                            if ctx.bell_enabled {
                                crate::app::ring_bell();
                            }
                            if ctx.notify_enabled {
                                crate::notify::notify_bulk_complete(&self.batch_title, count);
                            }
                        }
                    }
                    ProgressEvent::Error(e) => self.error = Some(e),
                }
            }
            if became_terminal {
                self.progress = None;
                self.mode = Mode::Results;
            }
        }
    }

    fn load_files(&mut self, path: &std::path::Path) {
        match parse_bulk_config(path) {
            Ok(cfg) => {
                self.repository_name = cfg.repository_name;
                self.source_branch = if cfg.source_branch.is_empty() { "main".to_string() } else { cfg.source_branch };
                self.run_type = if cfg.run_type.is_empty() { RunType::Run } else { RunType::from_str(&cfg.run_type) };
                self.batch_title = if cfg.batch_title.is_empty() { "bulk run".to_string() } else { cfg.batch_title };
                self.items = cfg
                    .runs
                    .into_iter()
                    .map(|entry| BulkRunItem {
                        title: entry.title,
                        prompt: entry.prompt,
                        context: entry.context,
                        source: entry.source,
                        target: entry.target,
                        files: entry.files,
                        selected: true,
                        id: None,
                        status: None,
                        error: None,
                    })
                    .collect();
                self.selected = 0;
                self.mode = Mode::RunList;
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn load_example(&mut self, idx: usize) {
        let Some(example) = EXAMPLES.get(idx) else {
            return;
        };
        self.batch_title = example.batch_title.to_string();
        self.items = example
            .items
            .iter()
            .map(|(title, prompt)| BulkRunItem {
                title: title.to_string(),
                prompt: prompt.to_string(),
                context: String::new(),
                source: String::new(),
                target: String::new(),
                files: Vec::new(),
                selected: true,
                id: None,
                status: None,
                error: None,
            })
            .collect();
        self.selected = 0;
        self.mode = Mode::RunList;
    }

    /// Kicks off CreateBulkRuns on a background thread. The transition to
    /// `Mode::Results` happens later, in `tick`, once the progress poller
    /// observes every item has reached a terminal status.
    fn start_submit(&mut self, ctx: &AppContext) {
        let runs: Vec<CreateRunRequest> = self
            .items
            .iter()
            .filter(|i| i.selected)
            .map(|i| CreateRunRequest {
                repository: self.repository_name.clone(),
                prompt: i.prompt.clone(),
                source: if i.source.is_empty() { self.source_branch.clone() } else { i.source.clone() },
                target: i.target.clone(),
                run_type: self.run_type.as_str().to_string(),
                title: i.title.clone(),
                context: i.context.clone(),
                files: i.files.clone(),
            })
            .collect();
        if runs.is_empty() {
            return;
        }
        let req = CreateBulkRunsRequest {
            repository_name: self.repository_name.clone(),
            repo_id: None,
            source_branch: self.source_branch.clone(),
            run_type: self.run_type.as_str().to_string(),
            batch_title: self.batch_title.clone(),
            force: false,
            runs,
        };

        self.mode = Mode::Progress;
        let client = Arc::clone(&ctx.client);
        self.pending_submit = Some(BackgroundJob::spawn(move || -> Result<BulkBatch, String> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| format!("runtime init failed: {e}"))?;
            rt.block_on(client.create_bulk_runs(&req))
        }));
    }

    fn start_cancel(&mut self, ctx: &AppContext) {
        let Some(batch) = &self.batch else {
            self.mode = Mode::RunList;
            return;
        };
        let client = Arc::clone(&ctx.client);
        let batch_id = batch.batch_id.clone();
        self.pending_cancel = Some(BackgroundJob::spawn(move || -> Result<(), String> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| format!("runtime init failed: {e}"))?;
            rt.block_on(client.cancel_bulk_runs(&batch_id))
        }));
    }

    fn clear_edit_field(&mut self) {
        let Some(item) = self.items.get_mut(self.selected) else {
            return;
        };
        match self.edit_field {
            0 => item.title.clear(),
            1 => item.prompt.clear(),
            2 => item.source.clear(),
            3 => item.target.clear(),
            4 => item.context.clear(),
            _ => {}
        }
    }

    fn push_edit_char(&mut self, ch: char) {
        let Some(item) = self.items.get_mut(self.selected) else {
            return;
        };
        match self.edit_field {
            0 => item.title.push(ch),
            1 => item.prompt.push(ch),
            2 => item.source.push(ch),
            3 => item.target.push(ch),
            4 => item.context.push(ch),
            _ => {}
        }
    }

    fn pop_edit_char(&mut self) {
        let Some(item) = self.items.get_mut(self.selected) else {
            return;
        };
        match self.edit_field {
            0 => { item.title.pop(); }
            1 => { item.prompt.pop(); }
            2 => { item.source.pop(); }
            3 => { item.target.pop(); }
            4 => { item.context.pop(); }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers, ctx: &mut AppContext) -> ViewOutcome {
        if self.pending_submit.is_some() || self.pending_cancel.is_some() {
            return ViewOutcome::None;
        }

        match self.mode {
            Mode::Instructions => match code {
                KeyCode::Char('f') => {
                    let root = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                    let mut selector = FileSelector::new(root);
                    selector.activate();
                    self.file_selector = Some(selector);
                    self.mode = Mode::FileBrowser;
                    ViewOutcome::None
                }
                KeyCode::Char('e') => {
                    self.example_selected = 0;
                    self.mode = Mode::Examples;
                    ViewOutcome::None
                }
                KeyCode::Char('L') if !self.items.is_empty() => {
                    self.mode = Mode::RunList;
                    ViewOutcome::None
                }
                KeyCode::Char('q') | KeyCode::Esc => ViewOutcome::Nav(NavMsg::Back),
                _ => ViewOutcome::None,
            },
            Mode::FileBrowser => {
                let Some(selector) = &mut self.file_selector else {
                    self.mode = Mode::Instructions;
                    return ViewOutcome::None;
                };
                match code {
                    KeyCode::Esc => {
                        self.file_selector = None;
                        self.mode = Mode::Instructions;
                    }
                    KeyCode::Down | KeyCode::Char('j') => selector.move_down(),
                    KeyCode::Up | KeyCode::Char('k') => selector.move_up(),
                    KeyCode::Enter => {
                        if let Some(path) = selector.get_selection().map(|p| p.to_path_buf()) {
                            self.file_selector = None;
                            self.load_files(&path);
                        }
                    }
                    KeyCode::Backspace => selector.pop_query_char(),
                    KeyCode::Char(c) => selector.push_query_char(c),
                    _ => {}
                }
                ViewOutcome::None
            }
            Mode::Examples => match code {
                KeyCode::Down | KeyCode::Char('j') => {
                    if !EXAMPLES.is_empty() {
                        self.example_selected = (self.example_selected + 1) % EXAMPLES.len();
                    }
                    ViewOutcome::None
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if !EXAMPLES.is_empty() {
                        self.example_selected = if self.example_selected == 0 { EXAMPLES.len() - 1 } else { self.example_selected - 1 };
                    }
                    ViewOutcome::None
                }
                KeyCode::Enter => {
                    self.load_example(self.example_selected);
                    ViewOutcome::None
                }
                KeyCode::Esc | KeyCode::Char('q') => {
                    self.mode = Mode::Instructions;
                    ViewOutcome::None
                }
                _ => ViewOutcome::None,
            },
            Mode::RunList => match code {
                KeyCode::Char(' ') => {
                    if let Some(item) = self.items.get_mut(self.selected) {
                        item.selected = !item.selected;
                    }
                    ViewOutcome::None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if !self.items.is_empty() {
                        self.selected = (self.selected + 1) % self.items.len();
                    }
                    ViewOutcome::None
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if !self.items.is_empty() {
                        self.selected = if self.selected == 0 { self.items.len() - 1 } else { self.selected - 1 };
                    }
                    ViewOutcome::None
                }
                KeyCode::Enter if !self.items.is_empty() => {
                    self.edit_field = 0;
                    self.mode = Mode::RunEdit;
                    ViewOutcome::None
                }
                KeyCode::Char('f') => {
                    let root = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                    let mut selector = FileSelector::new(root);
                    selector.activate();
                    self.file_selector = Some(selector);
                    self.mode = Mode::FileBrowser;
                    ViewOutcome::None
                }
                KeyCode::Char('e') => {
                    self.example_selected = 0;
                    self.mode = Mode::Examples;
                    ViewOutcome::None
                }
                KeyCode::Char('s') if mods.contains(KeyModifiers::CONTROL) => {
                    self.start_submit(ctx);
                    ViewOutcome::None
                }
                KeyCode::Char('q') | KeyCode::Esc => ViewOutcome::Nav(NavMsg::Back),
                _ => ViewOutcome::None,
            },
            Mode::RunEdit => match code {
                KeyCode::Esc | KeyCode::Enter => {
                    self.mode = Mode::RunList;
                    ViewOutcome::None
                }
                KeyCode::Tab | KeyCode::Down => {
                    self.edit_field = (self.edit_field + 1) % EDIT_FIELD_COUNT;
                    ViewOutcome::None
                }
                KeyCode::BackTab | KeyCode::Up => {
                    self.edit_field = if self.edit_field == 0 { EDIT_FIELD_COUNT - 1 } else { self.edit_field - 1 };
                    ViewOutcome::None
                }
                KeyCode::Char('d') if mods.contains(KeyModifiers::CONTROL) => {
                    self.clear_edit_field();
                    ViewOutcome::None
                }
                KeyCode::Char(c) => {
                    self.push_edit_char(c);
                    ViewOutcome::None
                }
                KeyCode::Backspace => {
                    self.pop_edit_char();
                    ViewOutcome::None
                }
                _ => ViewOutcome::None,
            },
            Mode::Progress => match code {
                KeyCode::Esc => {
                    self.start_cancel(ctx);
                    ViewOutcome::None
                }
                _ => ViewOutcome::None,
            },
            Mode::Results => match code {
                KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Esc => ViewOutcome::Nav(NavMsg::ToDashboard),
                _ => ViewOutcome::None,
            },
        }
    }

    pub fn render(&mut self, frame: &mut Frame, ctx: &mut AppContext) {
        let size = frame.area();
        let layout = WindowLayout::new(size.width, size.height);
        if !layout.is_valid_dimensions() {
            frame.render_widget(Paragraph::new("window too small"), size);
            return;
        }
        frame.render_widget(WindowLayout::bordered_box(" Bulk Runs "), layout.outer_area());
        let content = layout.content_area();

        match self.mode {
            Mode::Instructions => {
                let text = "f: open file browser   e: examples   L: run list (if loaded)   q: back";
                frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), content);
            }
            Mode::FileBrowser => {
                if let Some(selector) = &self.file_selector {
                    let cols = RatLayout::default()
                        .direction(Direction::Horizontal)
                        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .split(content);
                    let selected = selector.selected_index();
                    let items: Vec<ListItem> = selector
                        .get_filtered_items()
                        .iter()
                        .enumerate()
                        .map(|(i, p)| {
                            let style = if i == selected {
                                Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                            } else {
                                Style::default()
                            };
                            ListItem::new(p.display().to_string()).style(style)
                        })
                        .collect();
                    frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("Select bulk config")), cols[0]);
                    let preview = selector.preview().unwrap_or_default();
                    frame.render_widget(Paragraph::new(preview).block(Block::default().borders(Borders::ALL).title("Preview")), cols[1]);
                }
            }
            Mode::Examples => {
                let items: Vec<ListItem> = EXAMPLES
                    .iter()
                    .enumerate()
                    .map(|(i, ex)| {
                        let style = if i == self.example_selected {
                            Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        ListItem::new(format!("{} ({} runs)", ex.name, ex.items.len())).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("Examples (Enter:load  Esc:back)")), content);
            }
            Mode::RunList => {
                let items: Vec<ListItem> = self
                    .items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let mark = if item.selected { "[x]" } else { "[ ]" };
                        let style = if i == self.selected {
                            Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        ListItem::new(format!("{mark} {}", item.title)).style(style)
                    })
                    .collect();
                let title = "Runs (space:toggle  Enter:edit  e:examples  Ctrl-S:submit)";
                frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title(title)), content);
            }
            Mode::RunEdit => {
                let item = self.items.get(self.selected);
                let rows = [
                    format!("[0] Title: {}", item.map(|i| i.title.as_str()).unwrap_or("")),
                    format!("[1] Prompt: {}", item.map(|i| i.prompt.as_str()).unwrap_or("")),
                    format!("[2] Source: {}", item.map(|i| i.source.as_str()).unwrap_or("")),
                    format!("[3] Target: {}", item.map(|i| i.target.as_str()).unwrap_or("")),
                    format!("[4] Context: {}", item.map(|i| i.context.as_str()).unwrap_or("")),
                ];
                let rows: Vec<ListItem> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        let style = if i == self.edit_field {
                            Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        ListItem::new(r.clone()).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(rows).block(Block::default().borders(Borders::ALL).title("Edit run (Tab:field  Ctrl-D:clear  Esc/Enter:done)")), content);
            }
            Mode::Progress => {
                let text = match &self.batch {
                    Some(batch) => {
                        let done = batch.items.iter().filter(|i| i.status.map(|s| s.is_terminal()).unwrap_or(false)).count();
                        format!("Submitting batch {}… {done}/{} complete (Esc to cancel)", batch.batch_id, batch.items.len())
                    }
                    None => "Submitting…".to_string(),
                };
                frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), content);
            }
            Mode::Results => {
                let items: Vec<ListItem> = self
                    .items
                    .iter()
                    .map(|item| {
                        let status = item.status.map(|s| s.as_str()).unwrap_or("-");
                        let err = item.error.clone().unwrap_or_default();
                        ListItem::new(format!("{} {} {} {err}", item.id.clone().unwrap_or_default(), item.title, status))
                    })
                    .collect();
                let title = self.batch.as_ref().map(|b| format!("Results (batch {})", b.batch_id)).unwrap_or_else(|| "Results".to_string());
                frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title(title)), content);
            }
        }

        if let Some(err) = &self.error {
            frame.render_widget(Paragraph::new(format!("✗ {err}")), layout.status_line_area());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_requires_at_least_one_selected_item() {
        let view = BulkView::new();
        assert!(view.items.is_empty());
    }

    #[test]
    fn examples_are_nonempty_and_loadable() {
        let mut view = BulkView::new();
        view.load_example(0);
        assert_eq!(view.mode, Mode::RunList);
        assert!(!view.items.is_empty());
    }
}
