mod app;
mod cache;
mod client;
mod clipboard;
mod components;
mod config;
mod config_file;
mod demo;
mod layout;
mod model;
mod navigation;
mod notify;
mod poller;
mod task;
mod views;

use crate::app::{run_tui, AppContext};
use crate::cache::{cache_path, Cache};
use crate::client::RepoBirdClient;
use crate::clipboard::ClipboardManager;
use clap::{ArgAction, Parser};
use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "https://api.repobird.ai";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "repobird",
    version,
    about = "TUI for managing RepoBird AI code-generation runs",
    disable_version_flag = true
)]
struct CliArgs {
    /// Print version information (-v, -V, --version).
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    /// Run against fixed demo data, no account or API key required.
    #[arg(long)]
    demo: bool,

    /// Clear the on-disk cache before starting.
    #[arg(long = "purge-cache")]
    purge_cache: bool,

    /// Override the RepoBird API base URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Emit a terminal bell on important run-status events.
    #[arg(long)]
    bell: bool,

    /// Disable OS desktop notifications.
    #[arg(long)]
    no_notifications: bool,
}

fn main() {
    let args = CliArgs::parse();
    let config = config::load_config();

    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| config.api_endpoint.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let bell_enabled = args.bell || config.bell.unwrap_or(false);
    let notify_enabled = !(args.no_notifications || config.no_notifications.unwrap_or(false));
    let poll_tick_interval = config
        .poll_interval_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or(poller::DEFAULT_TICK_INTERVAL);
    let poll_age_ceiling_hours = config.poll_age_ceiling_hours.unwrap_or(poller::DEFAULT_AGE_CEILING_HOURS);

    let path = cache_path().unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });
    if args.purge_cache {
        let _ = std::fs::remove_file(&path);
    }
    let cache = Arc::new(Cache::load(&path));
    if !args.demo {
        // A non-terminal run left over from a previous session has no
        // poller attached until its Details view is reopened; treat it as
        // stale so Dashboard re-fetches rather than showing a frozen status.
        cache.invalidate_active_runs();
    }

    if args.demo {
        cache.set_runs(demo::demo_runs());
    }

    if let Some(repo) = &config.default_repository {
        cache.set_navigation_context("default_repository", Some(serde_json::Value::String(repo.clone())));
    }

    let token = if args.demo {
        "demo-token".to_string()
    } else {
        std::env::var("REPOBIRD_API_KEY").unwrap_or_else(|_| {
            eprintln!("Missing REPOBIRD_API_KEY env var (or pass --demo to try it without an account)");
            std::process::exit(1);
        })
    };

    let client = RepoBirdClient::new(endpoint, token).unwrap_or_else(|e| {
        eprintln!("Failed to init RepoBird client: {e}");
        std::process::exit(1);
    });

    let ctx = AppContext {
        cache,
        client: Arc::new(client),
        clipboard: ClipboardManager::new(),
        bell_enabled,
        notify_enabled,
        poll_tick_interval,
        poll_age_ceiling_hours,
    };

    if let Err(e) = run_tui(ctx) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
