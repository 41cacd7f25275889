//! Core data model shared by the cache, the client, and every view.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type RunId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Queued,
    Initializing,
    Processing,
    PostProcess,
    Done,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued
                | RunStatus::Initializing
                | RunStatus::Processing
                | RunStatus::PostProcess
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn icon(&self) -> &'static str {
        match self {
            RunStatus::Queued => "⏳",
            RunStatus::Initializing => "🔧",
            RunStatus::Processing => "⚙️",
            RunStatus::PostProcess => "🧹",
            RunStatus::Done => "✅",
            RunStatus::Failed => "❌",
            RunStatus::Cancelled => "🚫",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Initializing => "initializing",
            RunStatus::Processing => "processing",
            RunStatus::PostProcess => "postprocess",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "queued" => RunStatus::Queued,
            "initializing" => RunStatus::Initializing,
            "processing" => RunStatus::Processing,
            "postprocess" | "post_process" => RunStatus::PostProcess,
            "done" | "completed" => RunStatus::Done,
            "failed" | "error" => RunStatus::Failed,
            "cancelled" | "canceled" => RunStatus::Cancelled,
            _ => RunStatus::Queued,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunType {
    #[default]
    Run,
    Plan,
    Approval,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Run => "run",
            RunType::Plan => "plan",
            RunType::Approval => "approval",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "plan" => RunType::Plan,
            "approval" => RunType::Approval,
            _ => RunType::Run,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub title: String,
    pub description: String,
    pub repository: String,
    pub repo_id: Option<i64>,
    pub source: String,
    pub target: String,
    pub run_type: RunType,
    pub status: RunStatus,
    pub prompt: String,
    pub context: String,
    pub plan: String,
    pub error: String,
    pub pr_url: Option<String>,
    pub trigger_source: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Run {
    /// Prefers the modern `repository` field, falls back to the legacy one
    /// (same field today, kept distinct to document the invariant: callers
    /// that read a raw DTO off the wire should prefer `repositoryName` over
    /// `repository` when both are present).
    pub fn repository_name(&self) -> &str {
        &self.repository
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub description: String,
    pub run_counts: RunCounts,
    pub last_activity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRepository {
    pub id: i64,
    pub name: String,
    pub repo_owner: String,
    pub repo_name: String,
}

impl ApiRepository {
    pub fn full_name(&self) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.repo_owner, self.repo_name)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkRunItem {
    pub title: String,
    pub prompt: String,
    pub context: String,
    pub source: String,
    pub target: String,
    pub files: Vec<String>,
    pub selected: bool,
    // Populated once the batch has been submitted and results come back.
    pub id: Option<RunId>,
    pub status: Option<RunStatus>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkBatch {
    pub batch_id: String,
    pub repository_name: String,
    pub repo_id: Option<i64>,
    pub source_branch: String,
    pub run_type: RunType,
    pub batch_title: String,
    pub force: bool,
    pub items: Vec<BulkRunItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormDraft {
    pub run_type: RunType,
    pub repository: String,
    pub prompt: String,
    pub source: String,
    pub target: String,
    pub title: String,
    pub files: String,
    pub context: String,
    pub show_context: bool,
}

pub type FileHash = String;

/// One-shot signal bus. Values are erased to JSON so the cache can persist
/// and restore them along with everything else without a trait object.
pub type NavigationContext = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub tier: String,
    pub pro_remaining: u32,
    pub pro_total: u32,
    pub plan_remaining: u32,
    pub plan_total: u32,
}

impl UserInfo {
    pub fn is_enterprise(&self) -> bool {
        self.tier.eq_ignore_ascii_case("enterprise")
    }
}
