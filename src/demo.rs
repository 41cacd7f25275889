//! Deterministic fixture data for `--demo` mode, so the TUI can be driven
//! without a live RepoBird account or token. Grounded in the teacher's
//! `demo.rs`: a fixed spec table plus an FNV-1a hash for "randomness" that
//! stays stable across runs.

use crate::cache::now_unix;
use crate::model::{Run, RunStatus, RunType};

fn fnv1a_64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

#[derive(Clone, Copy)]
struct DemoRunSpec {
    owner: &'static str,
    repo: &'static str,
    title: &'static str,
    age_secs: i64,
    status: RunStatus,
    run_type: RunType,
}

const SPECS: &[DemoRunSpec] = &[
    DemoRunSpec {
        owner: "acme",
        repo: "backend",
        title: "Add retry backoff to the queue consumer",
        age_secs: 45,
        status: RunStatus::Processing,
        run_type: RunType::Run,
    },
    DemoRunSpec {
        owner: "acme",
        repo: "backend",
        title: "Fix off-by-one in pagination cursor",
        age_secs: 3_600,
        status: RunStatus::Done,
        run_type: RunType::Run,
    },
    DemoRunSpec {
        owner: "acme",
        repo: "frontend",
        title: "Dark mode for the settings page",
        age_secs: 7_200,
        status: RunStatus::Failed,
        run_type: RunType::Run,
    },
    DemoRunSpec {
        owner: "acme",
        repo: "frontend",
        title: "Plan: migrate to the new design tokens",
        age_secs: 600,
        status: RunStatus::Queued,
        run_type: RunType::Plan,
    },
    DemoRunSpec {
        owner: "acme",
        repo: "infra",
        title: "Rotate staging TLS certificates",
        age_secs: 86_400,
        status: RunStatus::Done,
        run_type: RunType::Run,
    },
    DemoRunSpec {
        owner: "acme",
        repo: "infra",
        title: "Investigate flaky deploy step",
        age_secs: 120,
        status: RunStatus::Initializing,
        run_type: RunType::Run,
    },
    DemoRunSpec {
        owner: "acme",
        repo: "docs",
        title: "Document the bulk-run config schema",
        age_secs: 172_800,
        status: RunStatus::Cancelled,
        run_type: RunType::Run,
    },
];

pub fn demo_runs() -> Vec<Run> {
    let now = now_unix();
    SPECS
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let id_seed = format!("{}/{}#{}", spec.owner, spec.repo, idx);
            let id = format!("demo-{:x}", fnv1a_64(&id_seed) & 0xffff_ffff);
            let updated_at = now.saturating_sub(spec.age_secs);
            let created_at = updated_at.saturating_sub(300);
            Run {
                id,
                title: spec.title.to_string(),
                description: String::new(),
                repository: format!("{}/{}", spec.owner, spec.repo),
                repo_id: Some((idx as i64) + 1),
                source: "main".to_string(),
                target: crate::config_file::target_slug(spec.title),
                run_type: spec.run_type,
                status: spec.status,
                prompt: format!("Demo prompt for: {}", spec.title),
                context: String::new(),
                plan: if matches!(spec.run_type, RunType::Plan) {
                    "1. Audit current tokens\n2. Introduce new palette\n3. Migrate components".to_string()
                } else {
                    String::new()
                },
                error: if matches!(spec.status, RunStatus::Failed) {
                    "error: test suite exited with status 1".to_string()
                } else {
                    String::new()
                },
                pr_url: if matches!(spec.status, RunStatus::Done) {
                    Some(format!(
                        "https://github.com/{}/{}/pull/{}",
                        spec.owner,
                        spec.repo,
                        100 + idx
                    ))
                } else {
                    None
                },
                trigger_source: Some("demo".to_string()),
                created_at,
                updated_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_have_stable_unique_ids() {
        let a = demo_runs();
        let b = demo_runs();
        assert_eq!(a.len(), SPECS.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
        }
        let ids: std::collections::HashSet<_> = a.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), a.len());
    }
}
