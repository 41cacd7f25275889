//! C7: the concurrency substrate. One `run_tui` call owns the terminal,
//! the cache, the clipboard, and the currently active view, and drives
//! everything from a single poll-based loop — mirroring the teacher's
//! `tui::run_tui`, generalized from one view (List/Details) to the six
//! this application needs.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::tty::IsTty;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::cache::Cache;
use crate::clipboard::ClipboardManager;
use crate::client::RepoBirdClient;
use crate::navigation::{DashboardRestore, NavMsg};
use crate::poller::Poller;
use crate::views::bulk::BulkView;
use crate::views::create::CreateView;
use crate::views::dashboard::DashboardView;
use crate::views::details::DetailsView;
use crate::views::help::HelpOverlay;
use crate::views::status::StatusView;

const EVENT_POLL: Duration = Duration::from_millis(50);

pub struct AppContext {
    pub cache: Arc<Cache>,
    pub client: Arc<RepoBirdClient>,
    pub clipboard: ClipboardManager,
    pub bell_enabled: bool,
    pub notify_enabled: bool,
    pub poll_tick_interval: Duration,
    pub poll_age_ceiling_hours: i64,
}

enum ActiveView {
    Dashboard(DashboardView),
    Details(Box<DetailsView>, Option<Poller>),
    Create(Box<CreateView>),
    Bulk(Box<BulkView>),
    Status(StatusView),
}

pub struct App {
    ctx: AppContext,
    view: ActiveView,
    help: Option<HelpOverlay>,
    should_quit: bool,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        let dashboard = DashboardView::new();
        Self {
            ctx,
            view: ActiveView::Dashboard(dashboard),
            help: None,
            should_quit: false,
        }
    }

    fn open_details(&mut self, run_id: String) {
        let cached = self.ctx.cache.get_run(&run_id);
        let mut details = DetailsView::new(run_id.clone());
        let poller = cached.as_ref().and_then(|run| {
            crate::poller::spawn(Arc::clone(&self.ctx.client), run, self.ctx.poll_tick_interval, self.ctx.poll_age_ceiling_hours)
        });
        if let Some(run) = cached {
            details.apply_run(run);
        } else {
            details.set_loading(true);
        }
        self.view = ActiveView::Details(Box::new(details), poller);
    }

    fn handle_nav(&mut self, msg: NavMsg) {
        match msg {
            NavMsg::Back | NavMsg::ToDashboard => {
                let restore = self
                    .ctx
                    .cache
                    .get_navigation_context("dashboard_restore")
                    .and_then(|value| serde_json::from_value(value).ok())
                    .map(|ctx| DashboardRestore::from_context(&ctx))
                    .unwrap_or_default();
                let mut dashboard = DashboardView::new();
                dashboard.restore(restore);
                self.view = ActiveView::Dashboard(dashboard);
            }
            NavMsg::ToDetails { run_id, parent_state } => {
                self.ctx.cache.set_navigation_context(
                    "dashboard_restore",
                    Some(serde_json::to_value(&parent_state).unwrap_or_default()),
                );
                self.open_details(run_id);
            }
        }
    }

    fn tick_pollers(&mut self) {
        let App { ctx, view, .. } = self;
        let outcome = match view {
            ActiveView::Dashboard(view) => {
                view.tick(ctx);
                None
            }
            ActiveView::Details(view, _) => {
                view.tick(ctx);
                None
            }
            ActiveView::Create(view) => view.tick(ctx),
            ActiveView::Bulk(view) => {
                view.tick(ctx);
                None
            }
            ActiveView::Status(view) => {
                view.tick(ctx);
                None
            }
        };
        if let Some(outcome) = outcome {
            self.apply_outcome(outcome);
        }

        let mut alert = None;
        if let ActiveView::Details(details, Some(poller)) = &mut self.view {
            for event in poller.drain() {
                if let Some(a) = details.apply_poll_event(event) {
                    alert = Some(a);
                }
            }
            if details.run_is_terminal() {
                poller.stop();
            }
        }
        if let Some((title, icon, label)) = alert {
            if self.ctx.bell_enabled {
                ring_bell();
            }
            if self.ctx.notify_enabled {
                crate::notify::notify_run_finished(&title, icon, &label);
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        if let Some(help) = &mut self.help {
            help.render(frame);
            return;
        }
        match &mut self.view {
            ActiveView::Dashboard(view) => view.render(frame, &mut self.ctx),
            ActiveView::Details(view, _) => view.render(frame, &mut self.ctx),
            ActiveView::Create(view) => view.render(frame, &mut self.ctx),
            ActiveView::Bulk(view) => view.render(frame, &mut self.ctx),
            ActiveView::Status(view) => view.render(frame, &mut self.ctx),
        }
    }

    fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) {
        if self.help.is_some() {
            if matches!(code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
                self.help = None;
            }
            return;
        }
        if code == KeyCode::Char('?') {
            self.help = Some(HelpOverlay::for_view(self.view_name()));
            return;
        }

        let outcome = match &mut self.view {
            ActiveView::Dashboard(view) => view.handle_key(code, mods, &mut self.ctx),
            ActiveView::Details(view, _) => view.handle_key(code, mods, &mut self.ctx),
            ActiveView::Create(view) => view.handle_key(code, mods, &mut self.ctx),
            ActiveView::Bulk(view) => view.handle_key(code, mods, &mut self.ctx),
            ActiveView::Status(view) => view.handle_key(code, mods, &mut self.ctx),
        };
        self.apply_outcome(outcome);
    }

    /// Shared by `handle_key`'s dispatch and `tick_pollers` (a background
    /// job, e.g. Create's submit, can resolve between keypresses and still
    /// needs to navigate).
    fn apply_outcome(&mut self, outcome: ViewOutcome) {
        match outcome {
            ViewOutcome::None => {}
            ViewOutcome::Quit => self.should_quit = true,
            ViewOutcome::Nav(msg) => self.handle_nav(msg),
            ViewOutcome::OpenCreate => {
                self.snapshot_dashboard();
                self.view = ActiveView::Create(Box::new(CreateView::new(&self.ctx)));
            }
            ViewOutcome::OpenBulk => {
                self.snapshot_dashboard();
                self.view = ActiveView::Bulk(Box::new(BulkView::new()));
            }
            ViewOutcome::OpenStatus => {
                self.snapshot_dashboard();
                self.view = ActiveView::Status(StatusView::new());
            }
        }
    }

    /// Stashes the current Dashboard's column/selection state so `Back`
    /// from Create/Bulk/Status restores it, the same way Details does.
    fn snapshot_dashboard(&self) {
        if let ActiveView::Dashboard(view) = &self.view {
            let ctx = view.snapshot().to_context();
            self.ctx
                .cache
                .set_navigation_context("dashboard_restore", Some(serde_json::to_value(&ctx).unwrap_or_default()));
        }
    }

    fn view_name(&self) -> &'static str {
        match &self.view {
            ActiveView::Dashboard(_) => "dashboard",
            ActiveView::Details(..) => "details",
            ActiveView::Create(_) => "create",
            ActiveView::Bulk(_) => "bulk",
            ActiveView::Status(_) => "status",
        }
    }
}

/// What a view's key handler hands back to the loop. Views never touch the
/// terminal, the cache's navigation context, or each other directly.
pub enum ViewOutcome {
    None,
    Quit,
    Nav(NavMsg),
    OpenCreate,
    OpenBulk,
    OpenStatus,
}

/// Rings the terminal bell directly on stdout; works inside the alternate
/// screen without needing a handle to the active `Terminal`.
pub fn ring_bell() {
    use std::io::Write;
    let mut out = io::stdout();
    let _ = out.write_all(b"\x07");
    let _ = out.flush();
}

pub fn run_tui(ctx: AppContext) -> Result<(), String> {
    if !io::stdin().is_tty() || !io::stdout().is_tty() {
        return Err("Not a TTY: run `repobird` in an interactive terminal.".to_string());
    }

    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {e}"))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| format!("Failed to enter alt screen: {e}"))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal: Terminal<CrosstermBackend<Stdout>> =
        Terminal::new(backend).map_err(|e| format!("Failed to init terminal: {e}"))?;

    let mut app = App::new(ctx);
    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {e}"))?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| format!("Failed to leave alt screen: {e}"))?;

    app.ctx.cache.save();
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<(), String> {
    loop {
        app.tick_pollers();

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("Failed to draw frame: {e}"))?;

        if event::poll(EVENT_POLL).map_err(|e| format!("Event poll failed: {e}"))? {
            if let Event::Key(key) = event::read().map_err(|e| format!("Event read failed: {e}"))? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
