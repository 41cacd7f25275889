//! C2: background status poller for an open Details view. Spawned when the
//! run shown is active and younger than the age ceiling; ticks on its own
//! thread and writes results into the shared cache rather than pushing
//! directly into view state, so multiple pollers on the same run id don't
//! race each other's renders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::client::RepoBirdClient;
use crate::model::Run;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_AGE_CEILING_HOURS: i64 = 3;

pub enum PollEvent {
    Updated(Run),
    Error(String),
}

/// Handle to a running poller. Dropping it does not stop the thread; call
/// `stop()` explicitly (idempotent) when the Details view closes or the run
/// reaches a terminal status.
pub struct Poller {
    stop_flag: Arc<AtomicBool>,
    rx: Receiver<PollEvent>,
    handle: Option<thread::JoinHandle<()>>,
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn run_age_hours(run: &Run) -> i64 {
    (now_unix() - run.created_at).max(0) / 3600
}

/// Starts a poller for `run_id`, or returns `None` if the run is already
/// terminal or too old to bother polling. `tick_interval`/`age_ceiling_hours`
/// come from the user's config (`config::poll_interval_secs`/
/// `poll_age_ceiling_hours`), falling back to the spec defaults above.
pub fn spawn(client: Arc<RepoBirdClient>, run: &Run, tick_interval: Duration, age_ceiling_hours: i64) -> Option<Poller> {
    if !run.status.is_active() {
        return None;
    }
    if run_age_hours(run) >= age_ceiling_hours {
        return None;
    }

    let (tx, rx): (Sender<PollEvent>, Receiver<PollEvent>) = channel();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_thread = Arc::clone(&stop_flag);
    let run_id = run.id.clone();
    let created_at = run.created_at;

    let handle = thread::spawn(move || {
        poll_loop(client, run_id, created_at, stop_flag_thread, tx, tick_interval, age_ceiling_hours);
    });

    Some(Poller {
        stop_flag,
        rx,
        handle: Some(handle),
    })
}

fn poll_loop(
    client: Arc<RepoBirdClient>,
    run_id: String,
    created_at: i64,
    stop_flag: Arc<AtomicBool>,
    tx: Sender<PollEvent>,
    tick_interval: Duration,
    age_ceiling_hours: i64,
) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = tx.send(PollEvent::Error(format!("poller runtime init failed: {e}")));
            return;
        }
    };

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }
        let age_hours = (now_unix() - created_at).max(0) / 3600;
        if age_hours >= age_ceiling_hours {
            return;
        }

        let result = rt.block_on(client.get_run(&run_id));
        match result {
            Ok(run) => {
                let is_terminal = run.status.is_terminal();
                if tx.send(PollEvent::Updated(run)).is_err() {
                    return;
                }
                if is_terminal {
                    return;
                }
            }
            Err(e) => {
                if tx.send(PollEvent::Error(e)).is_err() {
                    return;
                }
            }
        }

        for _ in 0..(tick_interval.as_millis() / 100) {
            if stop_flag.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }
}

impl Poller {
    /// Non-blocking drain of everything the background thread has produced
    /// since the last call.
    pub fn drain(&self) -> Vec<PollEvent> {
        self.rx.try_iter().collect()
    }

    /// Idempotent: calling this more than once, or on an already-finished
    /// poller, is a no-op.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunStatus, RunType};

    fn sample_run(status: RunStatus, created_at: i64) -> Run {
        Run {
            id: "run-1".to_string(),
            title: "t".to_string(),
            description: String::new(),
            repository: "acme/backend".to_string(),
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
            created_at,
            updated_at: created_at,
        }
    }

    fn test_client() -> Arc<RepoBirdClient> {
        Arc::new(
            RepoBirdClient::new("https://api.example.com".to_string(), "token".to_string())
                .unwrap(),
        )
    }

    #[test]
    fn does_not_spawn_for_terminal_run() {
        let run = sample_run(RunStatus::Done, now_unix());
        assert!(spawn(test_client(), &run, DEFAULT_TICK_INTERVAL, DEFAULT_AGE_CEILING_HOURS).is_none());
    }

    #[test]
    fn does_not_spawn_past_age_ceiling() {
        let stale = now_unix() - (DEFAULT_AGE_CEILING_HOURS + 1) * 3600;
        let run = sample_run(RunStatus::Processing, stale);
        assert!(spawn(test_client(), &run, DEFAULT_TICK_INTERVAL, DEFAULT_AGE_CEILING_HOURS).is_none());
    }

    #[test]
    fn stop_is_idempotent() {
        let run = sample_run(RunStatus::Processing, now_unix());
        let mut poller = spawn(test_client(), &run, DEFAULT_TICK_INTERVAL, DEFAULT_AGE_CEILING_HOURS)
            .expect("should spawn for active, fresh run");
        poller.stop();
        poller.stop();
    }
}
