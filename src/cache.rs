//! C1: the process-wide cache.
//!
//! One `Cache` is created at startup and lives until shutdown. Every public
//! method takes `&self` and serialises through an internal `Mutex` — the
//! lock is the cache's own, never exposed to callers, so views can never
//! hold a reference into mutable internal state across an `await`/render.
//!
//! Modelled on the teacher's `db.rs`: a handful of narrow, explicitly
//! documented operations returning owned data rather than borrows, with
//! failures collapsed to `String` and swallowed at the persistence layer.

use crate::model::{
    ApiRepository, FileHash, FormDraft, NavigationContext, Repository, Run, RunCounts, RunId,
    RunStatus, UserInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

const CACHE_VERSION: u32 = 1;

/// Per-repository slice of cached runs (the cache contract's
/// SetRepositoryData/GetRepositoryData row). Dashboard's flat `runs` map
/// stays the primary read path for the Miller browser; this slice exists
/// for callers that want one repository's runs and detail entries without
/// re-filtering the full list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoDataSlice {
    pub repository: String,
    pub runs: Vec<Run>,
    pub details: HashMap<RunId, Run>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    runs: Vec<Run>,
    list_cached: bool,
    run_details: HashMap<RunId, Run>,
    repository_overview: Option<Vec<Repository>>,
    api_repositories: HashMap<i64, ApiRepository>,
    repo_data: HashMap<String, RepoDataSlice>,
    user_info: Option<UserInfo>,
    user_info_fetched_at: Option<i64>,
    form_draft: Option<FormDraft>,
    submitted_file_hashes: HashMap<String, HashSet<FileHash>>,
    // Navigation context is single-shot and never worth persisting across a
    // restart; intentionally left out of the on-disk schema.
}

pub struct Cache {
    path: PathBuf,
    inner: Mutex<CacheFile>,
    nav_context: Mutex<NavigationContext>,
}

/// id has a test-fixture prefix, OR the repository name is empty once both
/// the modern and legacy fields have been consulted.
fn is_valid_run(run: &Run) -> bool {
    if run.id.starts_with("test-") {
        return false;
    }
    !run.repository_name().is_empty()
}

/// Pure filter used both for the on-disk load and for every subsequent read
/// of the cached list (Dashboard's load algorithm re-applies it defensively).
/// Returns `None` when the list should be discarded outright.
pub fn filter_valid(runs: Vec<Run>) -> Option<Vec<Run>> {
    if runs.is_empty() {
        return Some(runs);
    }
    let valid_count = runs.iter().filter(|r| is_valid_run(r)).count();
    let ratio = valid_count as f64 / runs.len() as f64;
    if ratio <= 0.5 {
        return None;
    }
    Some(runs.into_iter().filter(is_valid_run).collect())
}

/// Pure reducer: derives a repository overview from a run list without
/// touching the cache. Exposed standalone so Dashboard can call it directly
/// when deciding whether to rebuild (§4.1 "whenever SetRuns is called
/// without a matching overview").
pub fn build_repository_overview_from_runs(runs: &[Run]) -> Vec<Repository> {
    let mut by_name: HashMap<String, Repository> = HashMap::new();
    for run in runs {
        let name = run.repository_name().to_string();
        if name.is_empty() {
            continue;
        }
        let entry = by_name.entry(name.clone()).or_insert_with(|| Repository {
            name: name.clone(),
            description: String::new(),
            run_counts: RunCounts::default(),
            last_activity: 0,
        });
        entry.run_counts.total += 1;
        match run.status {
            s if s.is_active() => entry.run_counts.running += 1,
            RunStatus::Done => entry.run_counts.completed += 1,
            RunStatus::Failed | RunStatus::Cancelled => entry.run_counts.failed += 1,
            _ => {}
        }
        if run.updated_at > entry.last_activity {
            entry.last_activity = run.updated_at;
        }
    }
    let mut overview: Vec<Repository> = by_name.into_values().collect();
    overview.sort_by(|a, b| {
        let a_has_runs = a.run_counts.total > 0;
        let b_has_runs = b.run_counts.total > 0;
        match (a_has_runs, b_has_runs) {
            (true, true) => b.last_activity.cmp(&a.last_activity),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => a.name.cmp(&b.name),
        }
    });
    overview
}

pub fn cache_path() -> Result<PathBuf, String> {
    let base = dirs::data_dir().ok_or_else(|| "Failed to resolve data_dir()".to_string())?;
    Ok(base.join("repobird").join("cache.json"))
}

impl Cache {
    /// Loads from `path` if present and well-formed; a missing file,
    /// version mismatch, or parse error all silently produce an empty
    /// cache (§7 "Cache corruption on load: silently discard and start
    /// empty").
    pub fn load(path: &Path) -> Self {
        let loaded = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str::<CacheFile>(&s).ok())
            .filter(|f| f.version == CACHE_VERSION);

        let mut file = loaded.unwrap_or_default();
        file.version = CACHE_VERSION;
        if file.list_cached {
            match filter_valid(std::mem::take(&mut file.runs)) {
                Some(kept) => {
                    file.runs = kept;
                }
                None => {
                    file.runs = Vec::new();
                    file.list_cached = false;
                    file.repository_overview = None;
                }
            }
        }

        Self {
            path: path.to_path_buf(),
            inner: Mutex::new(file),
            nav_context: Mutex::new(HashMap::new()),
        }
    }

    pub fn save(&self) {
        let snapshot = {
            let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Warning: failed to create cache directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    eprintln!("Warning: failed to persist cache: {e}");
                }
            }
            Err(e) => eprintln!("Warning: failed to serialize cache: {e}"),
        }
    }

    // --- Runs -------------------------------------------------------

    pub fn get_cached_list(&self) -> (Vec<Run>, bool, HashMap<RunId, Run>) {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        (guard.runs.clone(), guard.list_cached, guard.run_details.clone())
    }

    pub fn set_runs(&self, runs: Vec<Run>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for run in &runs {
            guard.run_details.insert(run.id.clone(), run.clone());
        }
        guard.runs = runs;
        guard.list_cached = true;
        if guard.repository_overview.is_none() {
            guard.repository_overview = Some(build_repository_overview_from_runs(&guard.runs));
        }
    }

    pub fn get_run(&self, id: &str) -> Option<Run> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.run_details.get(id).cloned()
    }

    pub fn set_run(&self, run: Run) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = guard.runs.iter_mut().find(|r| r.id == run.id) {
            *existing = run.clone();
        }
        guard.run_details.insert(run.id.clone(), run);
    }

    // --- Repository overview ----------------------------------------

    pub fn get_repository_overview(&self) -> Option<Vec<Repository>> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.repository_overview.clone()
    }

    pub fn set_repository_overview(&self, repos: Vec<Repository>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.repository_overview = Some(repos);
    }

    // --- Per-repository data slice --------------------------------------

    pub fn get_repository_data(&self, repository: &str) -> Option<RepoDataSlice> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.repo_data.get(repository).cloned()
    }

    /// Merge semantics: replaces the slice's run list but keeps any
    /// existing detail entries for ids not present in `runs`.
    pub fn set_repository_data(&self, repository: &str, runs: Vec<Run>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let slice = guard.repo_data.entry(repository.to_string()).or_insert_with(|| RepoDataSlice {
            repository: repository.to_string(),
            runs: Vec::new(),
            details: HashMap::new(),
        });
        for run in &runs {
            slice.details.insert(run.id.clone(), run.clone());
        }
        slice.runs = runs;
    }

    // --- User info ----------------------------------------------------

    pub fn get_user_info(&self) -> Option<UserInfo> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.user_info.clone()
    }

    pub fn set_user_info(&self, info: UserInfo) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.user_info = Some(info);
        guard.user_info_fetched_at = Some(now_unix());
    }

    // --- Invalidation / clearing --------------------------------------

    pub fn invalidate_active_runs(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.runs.retain(|r| r.status.is_terminal());
        guard
            .run_details
            .retain(|_, r| r.status.is_terminal());
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let preserved_user_info = guard.user_info.clone();
        *guard = CacheFile {
            version: CACHE_VERSION,
            user_info: preserved_user_info,
            ..CacheFile::default()
        };
    }

    // --- Navigation context (single-shot signal bus) -------------------

    pub fn set_navigation_context(&self, key: &str, value: Option<serde_json::Value>) {
        let mut guard = self.nav_context.lock().unwrap_or_else(|e| e.into_inner());
        match value {
            Some(v) => {
                guard.insert(key.to_string(), v);
            }
            None => {
                guard.remove(key);
            }
        }
    }

    pub fn get_navigation_context(&self, key: &str) -> Option<serde_json::Value> {
        let guard = self.nav_context.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    /// Convenience for the common "is this one-shot flag set" check; does
    /// not remove it — callers that consume the signal must clear it
    /// explicitly via `set_navigation_context(key, None)`.
    pub fn take_navigation_flag(&self, key: &str) -> bool {
        let present = {
            let guard = self.nav_context.lock().unwrap_or_else(|e| e.into_inner());
            guard.get(key).map(|v| v.as_bool().unwrap_or(true)).unwrap_or(false)
        };
        if present {
            self.set_navigation_context(key, None);
        }
        present
    }

    // --- Form draft -----------------------------------------------------

    pub fn get_form_data(&self) -> Option<FormDraft> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.form_draft.clone()
    }

    pub fn set_form_data(&self, draft: FormDraft) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.form_draft = Some(draft);
    }

    pub fn clear_form_data(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.form_draft = None;
    }

    // --- Duplicate-submission detection ---------------------------------

    pub fn record_submitted_file_hash(&self, repository: &str, hash: FileHash) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .submitted_file_hashes
            .entry(repository.to_string())
            .or_default()
            .insert(hash);
    }

    pub fn is_duplicate_submission(&self, repository: &str, hash: &FileHash) -> bool {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .submitted_file_hashes
            .get(repository)
            .map(|set| set.contains(hash))
            .unwrap_or(false)
    }

    pub fn api_repositories(&self) -> HashMap<i64, ApiRepository> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.api_repositories.clone()
    }

    pub fn set_api_repositories(&self, repos: Vec<ApiRepository>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.api_repositories = repos.into_iter().map(|r| (r.id, r)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunType;

    fn mk_run(id: &str, repo: &str, status: RunStatus) -> Run {
        Run {
            id: id.to_string(),
            title: "t".to_string(),
            description: String::new(),
            repository: repo.to_string(),
            repo_id: None,
            source: "main".to_string(),
            target: "feature".to_string(),
            run_type: RunType::Run,
            status,
            prompt: String::new(),
            context: String::new(),
            plan: String::new(),
            error: String::new(),
            pr_url: None,
            trigger_source: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn set_runs_then_get_cached_list_round_trips() {
        let dir = std::env::temp_dir().join(format!("repobird-cache-test-{}", now_unix()));
        let cache = Cache::load(&dir.join("cache.json"));
        let runs = vec![
            mk_run("1", "a/b", RunStatus::Done),
            mk_run("2", "a/b", RunStatus::Processing),
        ];
        cache.set_runs(runs.clone());
        let (got, cached, _details) = cache.get_cached_list();
        assert!(cached);
        assert_eq!(got.len(), 2);
        assert!(cache.get_run("1").is_some());
        assert!(cache.get_run("2").is_some());
    }

    #[test]
    fn repository_overview_reduces_counts_correctly() {
        let runs = vec![
            mk_run("1", "a/b", RunStatus::Done),
            mk_run("2", "a/b", RunStatus::Processing),
        ];
        let overview = build_repository_overview_from_runs(&runs);
        assert_eq!(overview.len(), 1);
        let repo = &overview[0];
        assert_eq!(repo.run_counts.total, 2);
        assert_eq!(repo.run_counts.running, 1);
        assert_eq!(repo.run_counts.completed, 1);
        assert!(repo.run_counts.running + repo.run_counts.completed + repo.run_counts.failed <= repo.run_counts.total);
    }

    #[test]
    fn validity_filter_discards_below_threshold() {
        let runs = vec![
            mk_run("test-1", "", RunStatus::Done),
            mk_run("test-2", "", RunStatus::Done),
            mk_run("3", "a/b", RunStatus::Done),
            mk_run("4", "a/b", RunStatus::Done),
        ];
        // exactly 50% valid -> not > 50% -> discard
        assert!(filter_valid(runs).is_none());
    }

    #[test]
    fn validity_filter_keeps_and_trims_above_threshold() {
        let runs = vec![
            mk_run("test-1", "", RunStatus::Done),
            mk_run("2", "a/b", RunStatus::Done),
            mk_run("3", "a/b", RunStatus::Done),
        ];
        let kept = filter_valid(runs).expect("should be kept");
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| !r.id.starts_with("test-")));
    }

    #[test]
    fn invalidate_active_runs_keeps_only_terminal() {
        let dir = std::env::temp_dir().join(format!("repobird-cache-test2-{}", now_unix()));
        let cache = Cache::load(&dir.join("cache.json"));
        cache.set_runs(vec![
            mk_run("1", "a/b", RunStatus::Done),
            mk_run("2", "a/b", RunStatus::Processing),
        ]);
        cache.invalidate_active_runs();
        let (got, _, _) = cache.get_cached_list();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "1");
    }

    #[test]
    fn navigation_context_is_single_shot() {
        let dir = std::env::temp_dir().join(format!("repobird-cache-test3-{}", now_unix()));
        let cache = Cache::load(&dir.join("cache.json"));
        cache.set_navigation_context("dashboard_needs_refresh", Some(serde_json::Value::Bool(true)));
        assert!(cache.take_navigation_flag("dashboard_needs_refresh"));
        assert!(!cache.take_navigation_flag("dashboard_needs_refresh"));
    }

    #[test]
    fn repository_data_merge_preserves_existing_details() {
        let dir = std::env::temp_dir().join(format!("repobird-cache-test5-{}", now_unix()));
        let cache = Cache::load(&dir.join("cache.json"));
        cache.set_repository_data("a/b", vec![mk_run("1", "a/b", RunStatus::Done)]);
        cache.set_repository_data("a/b", vec![mk_run("2", "a/b", RunStatus::Processing)]);
        let slice = cache.get_repository_data("a/b").expect("slice present");
        assert_eq!(slice.runs.len(), 1);
        assert_eq!(slice.runs[0].id, "2");
        assert!(slice.details.contains_key("1"));
        assert!(slice.details.contains_key("2"));
    }

    #[test]
    fn form_draft_round_trips() {
        let dir = std::env::temp_dir().join(format!("repobird-cache-test4-{}", now_unix()));
        let cache = Cache::load(&dir.join("cache.json"));
        let draft = FormDraft {
            prompt: "do the thing".to_string(),
            repository: "a/b".to_string(),
            ..Default::default()
        };
        cache.set_form_data(draft.clone());
        let got = cache.get_form_data().expect("draft present");
        assert_eq!(got.prompt, draft.prompt);
        assert_eq!(got.repository, draft.repository);
    }
}
