//! C5c: Create — a modal form producing one RunRequest, optionally
//! prefilled from a config file, with vim-like Normal/Insert modes,
//! continuous validation, and duplicate-submission detection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout as RatLayout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::app::{AppContext, ViewOutcome};
use crate::client::CreateRunRequest;
use crate::components::file_selector::FileSelector;
use crate::components::fzf::FuzzyDropdown;
use crate::config_file::{hash_file, parse_run_config, run_type_or_default, target_slug};
use crate::layout::{Severity, StatusLine, WindowLayout};
use crate::model::{FormDraft, Run, RunType};
use crate::navigation::NavMsg;
use crate::task::BackgroundJob;

const FIELD_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirm {
    None,
    Reset,
    Duplicate,
}

pub struct CreateView {
    draft: FormDraft,
    focused_field: usize,
    mode: Mode,
    confirm: Confirm,
    file_selector: Option<FileSelector>,
    repo_picker: Option<FuzzyDropdown>,
    pending_hash: Option<String>,
    error: Option<String>,
    error_focused: bool,
    pending_submit: Option<BackgroundJob<Result<Run, String>>>,
    status: StatusLine,
}

impl CreateView {
    pub fn new(ctx: &AppContext) -> Self {
        let draft = ctx.cache.get_form_data().unwrap_or_default();
        Self {
            draft,
            focused_field: 0,
            mode: Mode::Normal,
            confirm: Confirm::None,
            file_selector: None,
            repo_picker: None,
            pending_hash: None,
            error: None,
            error_focused: false,
            pending_submit: None,
            status: StatusLine::new("CREATE", "i:insert  j/k:field  d:clear  c:change  Enter:activate  Ctrl-S:submit  r:reset  Esc:back"),
        }
    }

    /// Polls the in-flight submit, if any; on success this is where the
    /// navigation to Dashboard actually happens, since `do_submit`/
    /// `start_submit` only kicks the background call off.
    pub fn tick(&mut self, ctx: &AppContext) -> Option<ViewOutcome> {
        let job = self.pending_submit.as_ref()?;
        let result = job.poll()?;
        self.pending_submit = None;
        match result {
            Ok(run) => {
                if let Some(hash) = self.pending_hash.take() {
                    ctx.cache.record_submitted_file_hash(&self.draft.repository, hash);
                }
                ctx.cache.set_run(run);
                ctx.cache.clear_form_data();
                ctx.cache.set_navigation_context("dashboard_needs_refresh", Some(serde_json::Value::Bool(true)));
                Some(ViewOutcome::Nav(NavMsg::ToDashboard))
            }
            Err(e) => {
                self.error = Some(e);
                Some(ViewOutcome::None)
            }
        }
    }

    fn persist(&self, ctx: &AppContext) {
        ctx.cache.set_form_data(self.draft.clone());
    }

    fn validation_error(&self) -> Option<&'static str> {
        if self.draft.prompt.trim().is_empty() {
            return Some("prompt is required");
        }
        if self.draft.repository.trim().is_empty() {
            return Some("repository is required");
        }
        None
    }

    fn apply_config(&mut self, path: &std::path::Path) -> Result<(), String> {
        let cfg = parse_run_config(path)?;
        let hash = hash_file(path)?;
        self.draft.prompt = cfg.prompt;
        self.draft.repository = cfg.repository;
        self.draft.source = cfg.source;
        self.draft.target = cfg.target;
        self.draft.run_type = run_type_or_default(&cfg.run_type);
        self.draft.title = cfg.title;
        self.draft.context = cfg.context;
        self.draft.files = cfg.files.join(",");
        self.pending_hash = Some(hash);
        Ok(())
    }

    fn submit_request(&self) -> CreateRunRequest {
        let source = if self.draft.source.is_empty() { "main".to_string() } else { self.draft.source.clone() };
        let target = if self.draft.target.is_empty() {
            target_slug(if self.draft.title.is_empty() { &self.draft.prompt } else { &self.draft.title })
        } else {
            self.draft.target.clone()
        };
        CreateRunRequest {
            repository: self.draft.repository.clone(),
            prompt: self.draft.prompt.clone(),
            source,
            target,
            run_type: self.draft.run_type.as_str().to_string(),
            title: self.draft.title.clone(),
            context: self.draft.context.clone(),
            files: self.draft.files.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect(),
        }
    }

    /// Kicks off CreateRun on a background thread; never blocks the
    /// render/input thread. The outcome (navigate or re-show the error) is
    /// applied later, in `tick`, once the job resolves.
    fn start_submit(&mut self, ctx: &AppContext) -> ViewOutcome {
        self.error = None;
        self.error_focused = false;
        let req = self.submit_request();
        let client = Arc::clone(&ctx.client);
        self.pending_submit = Some(BackgroundJob::spawn(move || -> Result<Run, String> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| format!("runtime init failed: {e}"))?;
            rt.block_on(client.create_run(&req))
        }));
        ViewOutcome::None
    }

    pub fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers, ctx: &mut AppContext) -> ViewOutcome {
        if self.pending_submit.is_some() {
            return ViewOutcome::None;
        }

        if self.error_focused {
            match code {
                KeyCode::Char('y') => {
                    if let Some(err) = &self.error {
                        ctx.clipboard.copy(err);
                        if ctx.clipboard.last_copy_failed() {
                            self.status.show_message("✗ Failed to copy", Severity::Error, Duration::from_secs(2));
                        } else {
                            self.status.show_message("📋 Copied error", Severity::Info, Duration::from_millis(800));
                        }
                    }
                    return ViewOutcome::None;
                }
                KeyCode::Char('r') | KeyCode::Enter => {
                    self.error_focused = false;
                    return self.start_submit(ctx);
                }
                KeyCode::Esc | KeyCode::Char('q') => {
                    self.error_focused = false;
                    return ViewOutcome::None;
                }
                KeyCode::Char('j') | KeyCode::Down => {
                    self.error_focused = false;
                    self.focused_field = 0;
                    return ViewOutcome::None;
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    self.error_focused = false;
                    self.focused_field = FIELD_COUNT - 1;
                    return ViewOutcome::None;
                }
                _ => return ViewOutcome::None,
            }
        }

        if let Some(picker) = &mut self.repo_picker {
            match code {
                KeyCode::Esc => {
                    self.repo_picker = None;
                }
                KeyCode::Down => picker.move_down(),
                KeyCode::Up => picker.move_up(),
                KeyCode::Enter => {
                    if let Some(repo) = picker.get_selection() {
                        self.draft.repository = repo.to_string();
                    }
                    self.repo_picker = None;
                    self.persist(ctx);
                }
                KeyCode::Backspace => {
                    let mut q = picker.query().to_string();
                    q.pop();
                    picker.set_query(q);
                }
                KeyCode::Char(c) => {
                    let mut q = picker.query().to_string();
                    q.push(c);
                    picker.set_query(q);
                }
                _ => {}
            }
            return ViewOutcome::None;
        }

        if let Some(selector) = &mut self.file_selector {
            match code {
                KeyCode::Esc => {
                    self.file_selector = None;
                }
                KeyCode::Down | KeyCode::Char('j') => selector.move_down(),
                KeyCode::Up | KeyCode::Char('k') => selector.move_up(),
                KeyCode::Enter => {
                    if let Some(path) = selector.get_selection().map(|p| p.to_path_buf()) {
                        let result = self.apply_config(&path);
                        self.file_selector = None;
                        if let Err(e) = result {
                            self.error = Some(e);
                        } else {
                            let empty = String::new();
                            let hash = self.pending_hash.as_ref().unwrap_or(&empty);
                            if ctx.cache.is_duplicate_submission(&self.draft.repository, hash) {
                                self.confirm = Confirm::Duplicate;
                            }
                        }
                        self.persist(ctx);
                    }
                }
                KeyCode::Backspace => selector.pop_query_char(),
                KeyCode::Char(c) => selector.push_query_char(c),
                _ => {}
            }
            return ViewOutcome::None;
        }

        if self.confirm != Confirm::None {
            return match code {
                KeyCode::Char('y') => {
                    let was = self.confirm;
                    self.confirm = Confirm::None;
                    match was {
                        Confirm::Reset => {
                            self.draft = FormDraft::default();
                            ctx.cache.clear_form_data();
                            ViewOutcome::None
                        }
                        Confirm::Duplicate => self.start_submit(ctx),
                        Confirm::None => ViewOutcome::None,
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.confirm = Confirm::None;
                    ViewOutcome::None
                }
                _ => ViewOutcome::None,
            };
        }

        if mods.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('s') {
            return if self.validation_error().is_none() {
                self.start_submit(ctx)
            } else {
                ViewOutcome::None
            };
        }

        match self.mode {
            Mode::Normal => self.handle_normal_key(code, ctx),
            Mode::Insert => self.handle_insert_key(code, ctx),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, ctx: &mut AppContext) -> ViewOutcome {
        match code {
            KeyCode::Char('i') => {
                self.mode = Mode::Insert;
                ViewOutcome::None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.focused_field + 1 >= FIELD_COUNT && self.error.is_some() {
                    self.error_focused = true;
                } else {
                    self.focused_field = (self.focused_field + 1) % FIELD_COUNT;
                }
                ViewOutcome::None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.focused_field == 0 && self.error.is_some() {
                    self.error_focused = true;
                } else {
                    self.focused_field = if self.focused_field == 0 { FIELD_COUNT - 1 } else { self.focused_field - 1 };
                }
                ViewOutcome::None
            }
            KeyCode::Char('d') => {
                self.clear_field();
                self.persist(ctx);
                ViewOutcome::None
            }
            KeyCode::Char('c') => {
                self.clear_field();
                self.mode = Mode::Insert;
                self.persist(ctx);
                ViewOutcome::None
            }
            KeyCode::Char('r') => {
                self.confirm = Confirm::Reset;
                ViewOutcome::None
            }
            KeyCode::Enter => self.activate_field(ctx),
            KeyCode::Esc | KeyCode::Char('q') => ViewOutcome::Nav(NavMsg::Back),
            _ => ViewOutcome::None,
        }
    }

    fn handle_insert_key(&mut self, code: KeyCode, ctx: &mut AppContext) -> ViewOutcome {
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                ViewOutcome::None
            }
            KeyCode::Tab => {
                self.focused_field = (self.focused_field + 1) % FIELD_COUNT;
                ViewOutcome::None
            }
            KeyCode::BackTab => {
                self.focused_field = if self.focused_field == 0 { FIELD_COUNT - 1 } else { self.focused_field - 1 };
                ViewOutcome::None
            }
            KeyCode::Char('c') if self.focused_field == 8 => {
                self.draft.show_context = !self.draft.show_context;
                self.persist(ctx);
                ViewOutcome::None
            }
            KeyCode::Char(ch) => {
                self.push_char(ch);
                self.persist(ctx);
                ViewOutcome::None
            }
            KeyCode::Backspace => {
                self.pop_char();
                self.persist(ctx);
                ViewOutcome::None
            }
            _ => ViewOutcome::None,
        }
    }

    fn activate_field(&mut self, ctx: &mut AppContext) -> ViewOutcome {
        match self.focused_field {
            0 => {
                let root = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                let mut selector = FileSelector::new(root);
                selector.activate();
                self.file_selector = Some(selector);
                ViewOutcome::None
            }
            2 => {
                let names: Vec<String> = ctx
                    .cache
                    .get_repository_overview()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| r.name)
                    .collect();
                let mut picker = FuzzyDropdown::new(names);
                picker.activate();
                self.repo_picker = Some(picker);
                ViewOutcome::None
            }
            1 => {
                self.draft.run_type = match self.draft.run_type {
                    RunType::Run => RunType::Plan,
                    RunType::Plan => RunType::Run,
                    RunType::Approval => RunType::Run,
                };
                self.persist(ctx);
                ViewOutcome::None
            }
            8 => {
                self.draft.show_context = !self.draft.show_context;
                self.persist(ctx);
                ViewOutcome::None
            }
            _ => ViewOutcome::None,
        }
    }

    fn clear_field(&mut self) {
        match self.focused_field {
            2 => self.draft.repository.clear(),
            3 => self.draft.prompt.clear(),
            4 => self.draft.source.clear(),
            5 => self.draft.target.clear(),
            6 => self.draft.title.clear(),
            7 => self.draft.files.clear(),
            8 => self.draft.context.clear(),
            _ => {}
        }
    }

    fn push_char(&mut self, ch: char) {
        match self.focused_field {
            2 => self.draft.repository.push(ch),
            3 => self.draft.prompt.push(ch),
            4 => self.draft.source.push(ch),
            5 => self.draft.target.push(ch),
            6 => self.draft.title.push(ch),
            7 => self.draft.files.push(ch),
            8 => self.draft.context.push(ch),
            _ => {}
        }
    }

    fn pop_char(&mut self) {
        match self.focused_field {
            2 => { self.draft.repository.pop(); }
            3 => { self.draft.prompt.pop(); }
            4 => { self.draft.source.pop(); }
            5 => { self.draft.target.pop(); }
            6 => { self.draft.title.pop(); }
            7 => { self.draft.files.pop(); }
            8 => { self.draft.context.pop(); }
            _ => {}
        }
    }

    pub fn render(&mut self, frame: &mut Frame, ctx: &mut AppContext) {
        let size = frame.area();
        let layout = WindowLayout::new(size.width, size.height);
        if !layout.is_valid_dimensions() {
            frame.render_widget(Paragraph::new("window too small"), size);
            return;
        }
        frame.render_widget(WindowLayout::bordered_box(" Create Run "), layout.outer_area());
        let content = layout.content_area();

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
            frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("Select config file (Esc to cancel)")), cols[0]);
            let preview = selector.preview().unwrap_or_default();
            frame.render_widget(Paragraph::new(preview).block(Block::default().borders(Borders::ALL).title("Preview")), cols[1]);
            return;
        }

        if let Some(picker) = &self.repo_picker {
            let selected = picker.selected_index();
            let items: Vec<ListItem> = picker
                .get_filtered_items()
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let style = if i == selected {
                        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(*r).style(style)
                })
                .collect();
            let title = format!("Repository (query: {})  Esc to cancel", picker.query());
            frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title(title)), content);
            return;
        }

        let rows = [
            "[0] Load config file".to_string(),
            format!("[1] Run type: {}", self.draft.run_type.as_str()),
            format!("[2] Repository: {}", self.draft.repository),
            format!("[3] Prompt: {}", self.draft.prompt),
            format!("[4] Source: {}", self.draft.source),
            format!("[5] Target: {}", self.draft.target),
            format!("[6] Title: {}", self.draft.title),
            format!("[7] Files: {}", self.draft.files),
            format!("[8] Context{}: {}", if self.draft.show_context { " (shown)" } else { "" }, self.draft.context),
        ];
        let mut items: Vec<ListItem> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let style = if i == self.focused_field && !self.error_focused {
                    Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(r.clone()).style(style)
            })
            .collect();
        if let Some(err) = &self.error {
            let style = if self.error_focused {
                Style::default().bg(Color::Red).fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Red)
            };
            items.push(ListItem::new(format!("✗ {err}  (y:copy  r/Enter:retry)")).style(style));
        }
        frame.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title("Fields")), content);

        let confirm_label = if self.pending_submit.is_some() {
            "Submitting…".to_string()
        } else {
            match self.confirm {
                Confirm::None => match self.validation_error() {
                    None => "✓ Ready to submit (Ctrl-S)".to_string(),
                    Some(reason) => format!("✗ {reason}"),
                },
                Confirm::Reset => "Reset all fields? (y/n)".to_string(),
                Confirm::Duplicate => "This file was already submitted. Submit anyway? (y/n)".to_string(),
            }
        };
        let line = self.status.render(Some(&confirm_label), false);
        frame.render_widget(Paragraph::new(line), layout.status_line_area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_prompt_and_repository() {
        let draft = FormDraft::default();
        let view = CreateView {
            draft,
            focused_field: 0,
            mode: Mode::Normal,
            confirm: Confirm::None,
            file_selector: None,
            repo_picker: None,
            pending_hash: None,
            error: None,
            error_focused: false,
            pending_submit: None,
            status: StatusLine::new("CREATE", ""),
        };
        assert_eq!(view.validation_error(), Some("prompt is required"));
    }

    #[test]
    fn target_defaults_to_slug_of_title() {
        let mut draft = FormDraft::default();
        draft.prompt = "fix it".to_string();
        draft.repository = "acme/widgets".to_string();
        draft.title = "Fix the Bug".to_string();
        let view = CreateView {
            draft,
            focused_field: 0,
            mode: Mode::Normal,
            confirm: Confirm::None,
            file_selector: None,
            repo_picker: None,
            pending_hash: None,
            error: None,
            error_focused: false,
            pending_submit: None,
            status: StatusLine::new("CREATE", ""),
        };
        let req = view.submit_request();
        assert_eq!(req.target, "repobird/fix-the-bug");
        assert_eq!(req.source, "main");
    }
}
