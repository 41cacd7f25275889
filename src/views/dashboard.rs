//! C5a: the Dashboard — a three-column Miller browser (Repositories → Runs
//! → Details) plus two alternate layouts (All-Runs, Repositories-only).
//! The largest state machine in the application; everything here is a pure
//! function of `DashboardView` state plus whatever the cache currently
//! holds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout as RatLayout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::app::{AppContext, ViewOutcome};
use crate::cache::build_repository_overview_from_runs;
use crate::components::scrollable_list::ScrollableList;
use crate::layout::{Severity, StatusLine, WindowLayout};
use crate::model::{ApiRepository, Repository, Run, RunId};
use crate::navigation::{DashboardRestore, NavMsg};
use crate::task::BackgroundJob;

type FetchResult = (Result<Vec<ApiRepository>, String>, Result<Vec<Run>, String>);

const GG_WINDOW: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    Miller,
    AllRuns,
    ReposOnly,
}

impl ColumnLayout {
    fn next(self) -> Self {
        match self {
            ColumnLayout::Miller => ColumnLayout::AllRuns,
            ColumnLayout::AllRuns => ColumnLayout::ReposOnly,
            ColumnLayout::ReposOnly => ColumnLayout::Miller,
        }
    }
}

pub struct DashboardView {
    repositories: Vec<Repository>,
    api_repositories: HashMap<i64, ApiRepository>,
    all_runs: Vec<Run>,
    filtered_runs: Vec<Run>,
    selected_repo_idx: usize,
    selected_run_idx: usize,
    selected_detail_line: usize,
    focused_column: usize,
    current_layout: ColumnLayout,
    repo_col: ScrollableList,
    run_col: ScrollableList,
    detail_col: ScrollableList,
    detail_lines: Vec<String>,
    detail_lines_original: Vec<String>,
    detail_line_memory: HashMap<RunId, usize>,
    loading: bool,
    error: Option<String>,
    last_data_refresh: i64,
    show_url_selection_prompt: bool,
    waiting_for_g: Option<Instant>,
    status: StatusLine,
    loaded: bool,
    pending_restore: Option<DashboardRestore>,
    pending_fetch: Option<BackgroundJob<FetchResult>>,
    all_runs_col: ScrollableList,
}

impl DashboardView {
    /// Advances the status-line spinner and applies a finished background
    /// fetch, if any; a no-op frame-over-frame otherwise, so callers can
    /// tick every view unconditionally each frame.
    pub fn tick(&mut self, ctx: &AppContext) {
        if self.loading {
            self.status.tick_spinner();
        }
        if let Some(job) = &self.pending_fetch {
            if let Some((repos, runs)) = job.poll() {
                self.pending_fetch = None;
                self.apply_fetch_result(repos, runs, ctx);
            }
        }
    }

    pub fn new() -> Self {
        Self {
            repositories: Vec::new(),
            api_repositories: HashMap::new(),
            all_runs: Vec::new(),
            filtered_runs: Vec::new(),
            selected_repo_idx: 0,
            selected_run_idx: 0,
            selected_detail_line: 0,
            focused_column: 0,
            current_layout: ColumnLayout::Miller,
            repo_col: ScrollableList::new(0),
            run_col: ScrollableList::new(0),
            detail_col: ScrollableList::new(0),
            detail_lines: Vec::new(),
            detail_lines_original: Vec::new(),
            detail_line_memory: HashMap::new(),
            loading: false,
            error: None,
            last_data_refresh: 0,
            show_url_selection_prompt: false,
            waiting_for_g: None,
            status: StatusLine::new("DASHBOARD", "j/k:move  l/h/Tab:col  y:copy  o:open  r:refresh  L:layout  n:new  b:bulk  s:status  ?:help  Q:quit"),
            loaded: false,
            pending_restore: None,
            pending_fetch: None,
            all_runs_col: ScrollableList::new(0),
        }
    }

    /// Queues a restore to apply once data has loaded (`ensure_loaded`
    /// clamps it against the repository/run counts at that point, since a
    /// freshly-constructed view has none yet).
    pub fn restore(&mut self, restore: DashboardRestore) {
        self.pending_restore = Some(restore);
    }

    fn apply_pending_restore(&mut self) {
        let Some(restore) = self.pending_restore.take() else {
            return;
        };
        let restore = restore.clamp(self.repositories.len(), self.filtered_runs.len(), self.detail_lines.len());
        self.selected_repo_idx = restore.selected_repo_idx;
        self.focused_column = restore.focused_column;
        self.repo_col.selected = self.selected_repo_idx;
        self.load_runs_for_selected_repo();
        self.selected_run_idx = restore.selected_run_idx;
        self.run_col.selected = self.selected_run_idx;
        self.build_detail_lines();
        self.selected_detail_line = restore.selected_detail_line.min(self.detail_lines.len().saturating_sub(1));
        self.detail_col.selected = self.selected_detail_line;
    }

    pub fn snapshot(&self) -> DashboardRestore {
        DashboardRestore {
            selected_repo_idx: self.selected_repo_idx,
            selected_run_idx: self.selected_run_idx,
            selected_detail_line: self.selected_detail_line,
            focused_column: self.focused_column,
        }
    }

    /// §4.5 load algorithm.
    fn ensure_loaded(&mut self, ctx: &AppContext) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        if ctx.cache.take_navigation_flag("dashboard_needs_refresh") {
            self.fetch_from_network(ctx);
            return;
        }

        let (runs, cached, _details) = ctx.cache.get_cached_list();
        if cached {
            self.all_runs = runs;
            self.all_runs_col.set_len(self.all_runs.len());
            self.repositories = ctx
                .cache
                .get_repository_overview()
                .unwrap_or_else(|| build_repository_overview_from_runs(&self.all_runs));
            self.api_repositories = ctx.cache.api_repositories();
            self.last_data_refresh = crate::cache::now_unix();
            self.repo_col.set_len(self.repositories.len());
            self.apply_default_repository(ctx);
            self.load_runs_for_selected_repo();
            self.persist_repo_slice(ctx);
            self.build_detail_lines();
            self.apply_pending_restore();
            return;
        }

        self.fetch_from_network(ctx);
    }

    /// Kicks off the network fetch on a background thread (§5 "the main
    /// thread never blocks"); `tick` polls the result and runs
    /// `apply_fetch_result` once it resolves, mirroring `poller.rs`'s
    /// thread-builds-its-own-runtime pattern.
    fn fetch_from_network(&mut self, ctx: &AppContext) {
        self.loading = true;
        let client = Arc::clone(&ctx.client);
        self.pending_fetch = Some(BackgroundJob::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    let err = format!("failed to start runtime: {e}");
                    return (Err(err.clone()), Err(err));
                }
            };
            let repos = rt.block_on(client.list_repositories());
            let runs = rt.block_on(client.list_runs(1, 200));
            (repos, runs)
        }));
    }

    fn apply_fetch_result(&mut self, repos: Result<Vec<ApiRepository>, String>, runs: Result<Vec<Run>, String>, ctx: &AppContext) {
        self.loading = false;
        match repos {
            Ok(api_repos) => {
                ctx.cache.set_api_repositories(api_repos.clone());
                self.api_repositories = api_repos
                    .into_iter()
                    .map(|r| (r.id, r))
                    .collect();
            }
            Err(e) => self.error = Some(e),
        }

        self.all_runs = runs.unwrap_or_default();
        self.all_runs_col.set_len(self.all_runs.len());
        ctx.cache.set_runs(self.all_runs.clone());
        self.repositories = build_repository_overview_from_runs(&self.all_runs);
        ctx.cache.set_repository_overview(self.repositories.clone());
        self.last_data_refresh = crate::cache::now_unix();
        self.repo_col.set_len(self.repositories.len());
        self.apply_default_repository(ctx);
        self.load_runs_for_selected_repo();
        self.persist_repo_slice(ctx);
        self.build_detail_lines();
        self.apply_pending_restore();
    }

    /// Writes the currently-selected repository's run slice into the
    /// cache's per-repo contract row; merge semantics live in
    /// `Cache::set_repository_data` itself.
    fn persist_repo_slice(&self, ctx: &AppContext) {
        if let Some(repo) = self.repositories.get(self.selected_repo_idx) {
            ctx.cache.set_repository_data(&repo.name, self.filtered_runs.clone());
        }
    }

    /// Preselects `config.default_repository` on a fresh process start (no
    /// restored Dashboard state to honour instead).
    fn apply_default_repository(&mut self, ctx: &AppContext) {
        if self.pending_restore.is_some() {
            return;
        }
        let Some(name) = ctx
            .cache
            .get_navigation_context("default_repository")
            .and_then(|v| v.as_str().map(|s| s.to_string()))
        else {
            return;
        };
        if let Some(idx) = self.repositories.iter().position(|r| r.name == name) {
            self.selected_repo_idx = idx;
            self.repo_col.selected = idx;
        }
    }

    fn load_runs_for_selected_repo(&mut self) {
        if let Some(repo) = self.repositories.get(self.selected_repo_idx) {
            self.filtered_runs = self
                .all_runs
                .iter()
                .filter(|r| repo_matches(r, repo, &self.api_repositories))
                .cloned()
                .collect();
        } else {
            self.filtered_runs.clear();
        }
        self.run_col.set_len(self.filtered_runs.len());
        if let Some(run) = self.filtered_runs.get(self.selected_run_idx) {
            self.selected_detail_line = *self.detail_line_memory.get(&run.id).unwrap_or(&0);
        }
    }

    fn build_detail_lines(&mut self) {
        self.detail_lines.clear();
        self.detail_lines_original.clear();
        if let Some(run) = self.filtered_runs.get(self.selected_run_idx) {
            push_field(&mut self.detail_lines, &mut self.detail_lines_original, "Run ID", &run.id);
            push_field(&mut self.detail_lines, &mut self.detail_lines_original, "Title", &run.title);
            push_field(&mut self.detail_lines, &mut self.detail_lines_original, "Status", run.status.as_str());
            push_field(&mut self.detail_lines, &mut self.detail_lines_original, "Type", run.run_type.as_str());
            push_field(&mut self.detail_lines, &mut self.detail_lines_original, "Source", &run.source);
            push_field(&mut self.detail_lines, &mut self.detail_lines_original, "Target", &run.target);
            push_field(
                &mut self.detail_lines,
                &mut self.detail_lines_original,
                "Updated",
                &crate::views::human_age(crate::cache::now_unix(), run.updated_at),
            );
            if let Some(url) = &run.pr_url {
                push_field(&mut self.detail_lines, &mut self.detail_lines_original, "PR", url);
            }
        }
        self.detail_col.set_len(self.detail_lines.len());
        let clamped = self.selected_detail_line.min(self.detail_lines.len().saturating_sub(1));
        self.selected_detail_line = clamped;
        self.detail_col.selected = clamped;
    }

    fn move_within_column(&mut self, down: bool) {
        match self.current_layout {
            ColumnLayout::AllRuns => {
                if down {
                    self.all_runs_col.move_down();
                } else {
                    self.all_runs_col.move_up();
                }
                return;
            }
            ColumnLayout::ReposOnly => {
                if down {
                    self.repo_col.move_down();
                } else {
                    self.repo_col.move_up();
                }
                self.selected_repo_idx = self.repo_col.selected;
                return;
            }
            ColumnLayout::Miller => {}
        }
        match self.focused_column {
            0 => {
                if down {
                    self.repo_col.move_down();
                } else {
                    self.repo_col.move_up();
                }
                if self.selected_repo_idx != self.repo_col.selected {
                    self.selected_repo_idx = self.repo_col.selected;
                    self.load_runs_for_selected_repo();
                    self.build_detail_lines();
                }
            }
            1 => {
                if let Some(run) = self.filtered_runs.get(self.selected_run_idx) {
                    self.detail_line_memory.insert(run.id.clone(), self.selected_detail_line);
                }
                if down {
                    self.run_col.move_down();
                } else {
                    self.run_col.move_up();
                }
                self.selected_run_idx = self.run_col.selected;
                self.build_detail_lines();
            }
            _ => {
                if down {
                    self.detail_col.move_down();
                } else {
                    self.detail_col.move_up();
                }
                self.selected_detail_line = self.detail_col.selected;
            }
        }
    }

    fn move_first_or_last(&mut self, first: bool) {
        match self.current_layout {
            ColumnLayout::AllRuns => {
                if first {
                    self.all_runs_col.first();
                } else {
                    self.all_runs_col.last();
                }
                return;
            }
            ColumnLayout::ReposOnly => {
                if first {
                    self.repo_col.first();
                } else {
                    self.repo_col.last();
                }
                self.selected_repo_idx = self.repo_col.selected;
                return;
            }
            ColumnLayout::Miller => {}
        }
        match self.focused_column {
            0 => {
                if first {
                    self.repo_col.first();
                } else {
                    self.repo_col.last();
                }
                self.selected_repo_idx = self.repo_col.selected;
                self.load_runs_for_selected_repo();
                self.build_detail_lines();
            }
            1 => {
                if first {
                    self.run_col.first();
                } else {
                    self.run_col.last();
                }
                self.selected_run_idx = self.run_col.selected;
                self.build_detail_lines();
            }
            _ => {
                if first {
                    self.detail_col.first();
                } else {
                    self.detail_col.last();
                }
                self.selected_detail_line = self.detail_col.selected;
            }
        }
    }

    fn move_column_focus(&mut self, right: bool) {
        if right {
            if self.focused_column < 2 {
                self.focused_column += 1;
            }
        } else if self.focused_column > 0 {
            self.focused_column -= 1;
        }
    }

    fn copy_focused(&self, ctx: &mut AppContext) -> Option<String> {
        match self.focused_column {
            0 => self.repositories.get(self.selected_repo_idx).map(|r| r.name.clone()),
            1 => self
                .filtered_runs
                .get(self.selected_run_idx)
                .map(|r| format!("{} - {}", r.id, r.title)),
            _ => self.detail_lines_original.get(self.selected_detail_line).cloned(),
        }
        .map(|text| {
            ctx.clipboard.copy(&text);
            text
        })
    }

    pub fn handle_key(&mut self, code: KeyCode, _mods: KeyModifiers, ctx: &mut AppContext) -> ViewOutcome {
        self.ensure_loaded(ctx);

        if self.show_url_selection_prompt {
            self.show_url_selection_prompt = false;
            if let KeyCode::Char('r' | 'p' | 'u') = code {
                return ViewOutcome::None;
            }
        }

        if let Some(started) = self.waiting_for_g {
            self.waiting_for_g = None;
            if started.elapsed() <= GG_WINDOW && code == KeyCode::Char('g') {
                self.move_first_or_last(true);
                return ViewOutcome::None;
            }
        }

        match code {
            KeyCode::Char('Q') => ViewOutcome::Quit,
            KeyCode::Char('n') => ViewOutcome::OpenCreate,
            KeyCode::Char('b') => ViewOutcome::OpenBulk,
            KeyCode::Char('s') => ViewOutcome::OpenStatus,
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_within_column(true);
                ViewOutcome::None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_within_column(false);
                ViewOutcome::None
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.move_column_focus(true);
                ViewOutcome::None
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.move_column_focus(false);
                ViewOutcome::None
            }
            KeyCode::Tab => {
                self.focused_column = (self.focused_column + 1) % 3;
                ViewOutcome::None
            }
            KeyCode::Enter => match self.current_layout {
                ColumnLayout::AllRuns => {
                    if let Some(run) = self.all_runs.get(self.all_runs_col.selected) {
                        let run_id = run.id.clone();
                        let parent_state = self.snapshot().to_context();
                        return ViewOutcome::Nav(NavMsg::ToDetails { run_id, parent_state });
                    }
                    ViewOutcome::None
                }
                ColumnLayout::ReposOnly => {
                    self.selected_repo_idx = self.repo_col.selected;
                    self.load_runs_for_selected_repo();
                    self.build_detail_lines();
                    self.focused_column = 1;
                    self.current_layout = ColumnLayout::Miller;
                    ViewOutcome::None
                }
                ColumnLayout::Miller => {
                    if self.focused_column == 1 {
                        if let Some(run) = self.filtered_runs.get(self.selected_run_idx) {
                            let run_id = run.id.clone();
                            let parent_state = self.snapshot().to_context();
                            return ViewOutcome::Nav(NavMsg::ToDetails { run_id, parent_state });
                        }
                    }
                    if self.focused_column < 2 {
                        self.focused_column += 1;
                    }
                    ViewOutcome::None
                }
            },
            KeyCode::Backspace => {
                if self.focused_column > 0 {
                    self.focused_column -= 1;
                }
                ViewOutcome::None
            }
            KeyCode::Char('g') => {
                self.waiting_for_g = Some(Instant::now());
                ViewOutcome::None
            }
            KeyCode::Char('G') => {
                self.move_first_or_last(false);
                ViewOutcome::None
            }
            KeyCode::Char('y') => {
                if let Some(text) = self.copy_focused(ctx) {
                    if ctx.clipboard.last_copy_failed() {
                        self.status.show_message("✗ Failed to copy", Severity::Error, Duration::from_secs(2));
                    } else {
                        self.status.show_message(&format!("📋 Copied \"{text}\""), Severity::Info, Duration::from_millis(800));
                    }
                } else {
                    self.status.show_message("✗ Nothing to copy", Severity::Warning, Duration::from_millis(800));
                }
                ViewOutcome::None
            }
            KeyCode::Char('o') => {
                self.open_focused(ctx);
                ViewOutcome::None
            }
            KeyCode::Char('r') => {
                ctx.cache.clear();
                self.loaded = false;
                self.ensure_loaded(ctx);
                ViewOutcome::None
            }
            KeyCode::Char('L') => {
                self.current_layout = self.current_layout.next();
                ViewOutcome::None
            }
            KeyCode::Char('q') | KeyCode::Esc => ViewOutcome::Quit,
            _ => ViewOutcome::None,
        }
    }

    fn open_focused(&mut self, ctx: &mut AppContext) {
        if self.focused_column == 2 && self.selected_detail_line == 0 {
            if let Some(run) = self.filtered_runs.get(self.selected_run_idx) {
                let url = ctx.client.run_web_url(&run.id);
                let _ = open_url(&url);
                self.status.show_message("🌐 Opened in browser", Severity::Info, Duration::from_millis(800));
                return;
            }
        }
        if self.focused_column == 0 {
            self.show_url_selection_prompt = true;
        }
    }

    pub fn render(&mut self, frame: &mut Frame, ctx: &mut AppContext) {
        let blink = ctx.clipboard.should_highlight();
        let size = frame.area();
        let layout = WindowLayout::new(size.width, size.height);
        if !layout.is_valid_dimensions() {
            frame.render_widget(Paragraph::new("window too small"), size);
            return;
        }
        let outer = WindowLayout::bordered_box(" Dashboard ");
        frame.render_widget(outer, layout.outer_area());

        let content = layout.content_area();

        match self.current_layout {
            ColumnLayout::Miller => {
                let cols = RatLayout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(30), Constraint::Percentage(35), Constraint::Percentage(35)])
                    .split(content);

                let repo_height = cols[0].height.saturating_sub(2) as usize;
                self.repo_col.scroll_into_view(repo_height);
                let repo_items: Vec<ListItem> = self
                    .repositories
                    .iter()
                    .enumerate()
                    .skip(self.repo_col.offset)
                    .take(repo_height.max(1))
                    .map(|(i, r)| {
                        let style = column_item_style(i == self.selected_repo_idx && self.focused_column == 0, blink);
                        ListItem::new(format!("{} ({})", r.name, r.run_counts.total)).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(repo_items).block(Block::default().borders(Borders::ALL).title("Repositories")), cols[0]);

                let run_height = cols[1].height.saturating_sub(2) as usize;
                self.run_col.scroll_into_view(run_height);
                let run_items: Vec<ListItem> = self
                    .filtered_runs
                    .iter()
                    .enumerate()
                    .skip(self.run_col.offset)
                    .take(run_height.max(1))
                    .map(|(i, r)| {
                        let style = column_item_style(i == self.selected_run_idx && self.focused_column == 1, blink);
                        ListItem::new(format!("{} {} {}", r.status.icon(), r.id, r.title)).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(run_items).block(Block::default().borders(Borders::ALL).title("Runs")), cols[1]);

                let detail_height = cols[2].height.saturating_sub(2) as usize;
                self.detail_col.scroll_into_view(detail_height);
                let detail_items: Vec<ListItem> = self
                    .detail_lines
                    .iter()
                    .enumerate()
                    .skip(self.detail_col.offset)
                    .take(detail_height.max(1))
                    .map(|(i, l)| {
                        let style = column_item_style(i == self.selected_detail_line && self.focused_column == 2, blink);
                        ListItem::new(l.clone()).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(detail_items).block(Block::default().borders(Borders::ALL).title("Details")), cols[2]);
            }
            ColumnLayout::AllRuns => {
                let height = content.height.saturating_sub(2) as usize;
                self.all_runs_col.scroll_into_view(height);
                let items: Vec<ListItem> = self
                    .all_runs
                    .iter()
                    .enumerate()
                    .skip(self.all_runs_col.offset)
                    .take(height.max(1))
                    .map(|(i, r)| {
                        let style = column_item_style(i == self.all_runs_col.selected, blink);
                        ListItem::new(format!("{} {} {} {}", r.status.icon(), r.id, r.repository, r.title)).style(style)
                    })
                    .collect();
                frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("All Runs (flat timeline)")), content);
            }
            ColumnLayout::ReposOnly => {
                let height = content.height.saturating_sub(2) as usize;
                self.repo_col.scroll_into_view(height);
                let items: Vec<ListItem> = self
                    .repositories
                    .iter()
                    .enumerate()
                    .skip(self.repo_col.offset)
                    .take(height.max(1))
                    .map(|(i, r)| {
                        let style = column_item_style(i == self.repo_col.selected, blink);
                        ListItem::new(format!(
                            "{:<30} total:{:<4} running:{:<4} done:{:<4} failed:{:<4}",
                            r.name, r.run_counts.total, r.run_counts.running, r.run_counts.completed, r.run_counts.failed
                        ))
                        .style(style)
                    })
                    .collect();
                frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("Repositories")), content);
            }
        }

        let right = if self.show_url_selection_prompt {
            "open: [r]epo [p]rs [u]runs".to_string()
        } else {
            format!("{:?}", self.current_layout)
        };
        let line = self.status.render(Some(&right), self.loading);
        frame.render_widget(Paragraph::new(line), layout.status_line_area());
    }
}

fn column_item_style(selected: bool, blink: bool) -> Style {
    if selected && blink {
        Style::default().bg(Color::Green).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn push_field(lines: &mut Vec<String>, originals: &mut Vec<String>, label: &str, value: &str) {
    lines.push(format!("{label}: {value}"));
    originals.push(value.to_string());
}

fn repo_matches(run: &Run, repo: &Repository, api_repos: &HashMap<i64, ApiRepository>) -> bool {
    if !run.repository.is_empty() && run.repository == repo.name {
        return true;
    }
    if let Some(id) = run.repo_id {
        if let Some(api_repo) = api_repos.get(&id) {
            return api_repo.full_name() == repo.name;
        }
    }
    false
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
    use crate::model::{RunCounts, RunStatus, RunType};

    fn run(id: &str, repo: &str, status: RunStatus) -> Run {
        Run {
            id: id.to_string(),
            title: "t".to_string(),
            description: String::new(),
            repository: repo.to_string(),
            repo_id: None,
            source: "main".to_string(),
            target: "repobird/run".to_string(),
            run_type: RunType::Run,
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

    #[test]
    fn repo_matches_by_name() {
        let r = run("1", "acme/backend", RunStatus::Done);
        let repo = Repository {
            name: "acme/backend".to_string(),
            description: String::new(),
            run_counts: RunCounts::default(),
            last_activity: 0,
        };
        assert!(repo_matches(&r, &repo, &HashMap::new()));
    }

    #[test]
    fn detail_lines_include_run_id_and_title() {
        let mut view = DashboardView::new();
        view.filtered_runs = vec![run("42", "acme/backend", RunStatus::Processing)];
        view.selected_run_idx = 0;
        view.build_detail_lines();
        assert!(view.detail_lines.iter().any(|l| l.contains("42")));
        assert!(view.detail_lines_original.contains(&"42".to_string()));
    }
}
