//! The remote RepoBird HTTP API. Out of the core design's scope per the
//! spec (§1, §6) — this module is the "assumed" collaborator, kept
//! deliberately thin: one async function per documented operation,
//! typed request/response DTOs, errors collapsed to `String` the same
//! way the teacher's `github.rs` does for octocrab calls.

use crate::model::{ApiRepository, BulkBatch, Run, RunId, RunStatus, RunType, UserInfo};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RepoBirdClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct RunDto {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "repository")]
    repository_name: String,
    #[serde(default)]
    repo_id: Option<i64>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    target: String,
    #[serde(default, alias = "type")]
    run_type: String,
    status: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    plan: String,
    #[serde(default)]
    error: String,
    #[serde(default)]
    pr_url: Option<String>,
    #[serde(default)]
    trigger_source: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<RunDto> for Run {
    fn from(dto: RunDto) -> Self {
        Run {
            id: dto.id,
            title: dto.title,
            description: dto.description,
            repository: dto.repository_name,
            repo_id: dto.repo_id,
            source: dto.source,
            target: dto.target,
            run_type: RunType::from_str(&dto.run_type),
            status: RunStatus::from_str(&dto.status),
            prompt: dto.prompt,
            context: dto.context,
            plan: dto.plan,
            error: dto.error,
            pr_url: dto.pr_url,
            trigger_source: dto.trigger_source,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListRunsResponse {
    #[serde(rename = "Data")]
    data: Vec<RunDto>,
}

#[derive(Debug, Deserialize)]
struct ApiRepositoryDto {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    repo_owner: String,
    #[serde(default)]
    repo_name: String,
}

impl From<ApiRepositoryDto> for ApiRepository {
    fn from(dto: ApiRepositoryDto) -> Self {
        ApiRepository {
            id: dto.id,
            name: dto.name,
            repo_owner: dto.repo_owner,
            repo_name: dto.repo_name,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CreateRunRequest {
    pub repository: String,
    pub prompt: String,
    pub source: String,
    pub target: String,
    pub run_type: String,
    pub title: String,
    pub context: String,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CreateBulkRunsRequest {
    pub repository_name: String,
    pub repo_id: Option<i64>,
    pub source_branch: String,
    pub run_type: String,
    pub batch_title: String,
    pub force: bool,
    pub runs: Vec<CreateRunRequest>,
}

#[derive(Debug, Deserialize)]
struct BulkBatchDto {
    batch_id: String,
    #[serde(default)]
    results: Vec<RunDto>,
}

impl RepoBirdClient {
    pub fn new(base_url: String, token: String) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    pub async fn get_run(&self, id: &str) -> Result<Run, String> {
        if id.is_empty() {
            // §7: never issue the call for a missing/empty id; construct
            // the error without touching the network so callers keep their
            // existing state.
            return Err("cannot fetch run: empty id".to_string());
        }
        let resp = self
            .authed(self.http.get(self.url(&format!("/api/runs/{id}"))))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| format!("GetRun failed: {e}"))?;
        let dto: RunDto = resp
            .error_for_status()
            .map_err(|e| format!("GetRun failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("GetRun: bad response body: {e}"))?;
        Ok(dto.into())
    }

    pub async fn list_runs(&self, page: u32, limit: u32) -> Result<Vec<Run>, String> {
        let resp = self
            .authed(self.http.get(self.url("/api/runs")))
            .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| format!("ListRuns failed: {e}"))?;
        let parsed: ListRunsResponse = resp
            .error_for_status()
            .map_err(|e| format!("ListRuns failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("ListRuns: bad response body: {e}"))?;
        Ok(parsed.data.into_iter().map(Run::from).collect())
    }

    pub async fn list_repositories(&self) -> Result<Vec<ApiRepository>, String> {
        let resp = self
            .authed(self.http.get(self.url("/api/repositories")))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| format!("ListRepositories failed: {e}"))?;
        let dtos: Vec<ApiRepositoryDto> = resp
            .error_for_status()
            .map_err(|e| format!("ListRepositories failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("ListRepositories: bad response body: {e}"))?;
        Ok(dtos.into_iter().map(ApiRepository::from).collect())
    }

    pub async fn create_run(&self, req: &CreateRunRequest) -> Result<Run, String> {
        let resp = self
            .authed(self.http.post(self.url("/api/runs")))
            .json(req)
            .send()
            .await
            .map_err(|e| format!("CreateRun failed: {e}"))?;
        let dto: RunDto = resp
            .error_for_status()
            .map_err(|e| format!("CreateRun failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("CreateRun: bad response body: {e}"))?;
        Ok(dto.into())
    }

    pub async fn create_bulk_runs(&self, req: &CreateBulkRunsRequest) -> Result<BulkBatch, String> {
        let resp = self
            .authed(self.http.post(self.url("/api/runs/bulk")))
            .json(req)
            .send()
            .await
            .map_err(|e| format!("CreateBulkRuns failed: {e}"))?;
        let dto: BulkBatchDto = resp
            .error_for_status()
            .map_err(|e| format!("CreateBulkRuns failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("CreateBulkRuns: bad response body: {e}"))?;
        let items = dto
            .results
            .into_iter()
            .map(|r| crate::model::BulkRunItem {
                title: r.title.clone(),
                prompt: r.prompt.clone(),
                context: r.context.clone(),
                source: r.source.clone(),
                target: r.target.clone(),
                files: Vec::new(),
                selected: true,
                id: Some(r.id.clone()),
                status: Some(RunStatus::from_str(&r.status)),
                error: if r.error.is_empty() { None } else { Some(r.error.clone()) },
            })
            .collect();
        Ok(BulkBatch {
            batch_id: dto.batch_id,
            repository_name: req.repository_name.clone(),
            repo_id: req.repo_id,
            source_branch: req.source_branch.clone(),
            run_type: RunType::from_str(&req.run_type),
            batch_title: req.batch_title.clone(),
            force: req.force,
            items,
        })
    }

    /// Polls a bulk batch's status once; the caller (Bulk view's progress
    /// command) is responsible for the interval loop so the main thread
    /// never blocks (§5 "Suspension points").
    pub async fn poll_bulk_status(&self, batch_id: &str) -> Result<BulkBatch, String> {
        let resp = self
            .authed(self.http.get(self.url(&format!("/api/runs/bulk/{batch_id}"))))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| format!("PollBulkStatus failed: {e}"))?;
        let dto: BulkBatchDto = resp
            .error_for_status()
            .map_err(|e| format!("PollBulkStatus failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("PollBulkStatus: bad response body: {e}"))?;
        let items = dto
            .results
            .into_iter()
            .map(|r| crate::model::BulkRunItem {
                title: r.title.clone(),
                prompt: r.prompt.clone(),
                context: r.context.clone(),
                source: r.source.clone(),
                target: r.target.clone(),
                files: Vec::new(),
                selected: true,
                id: Some(r.id.clone()),
                status: Some(RunStatus::from_str(&r.status)),
                error: if r.error.is_empty() { None } else { Some(r.error.clone()) },
            })
            .collect();
        Ok(BulkBatch {
            batch_id: dto.batch_id,
            repository_name: String::new(),
            repo_id: None,
            source_branch: String::new(),
            run_type: RunType::Run,
            batch_title: String::new(),
            force: false,
            items,
        })
    }

    pub async fn cancel_bulk_runs(&self, batch_id: &str) -> Result<(), String> {
        self.authed(self.http.post(self.url(&format!("/api/runs/bulk/{batch_id}/cancel"))))
            .send()
            .await
            .map_err(|e| format!("CancelBulkRuns failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("CancelBulkRuns failed: {e}"))?;
        Ok(())
    }

    pub async fn get_user_info(&self) -> Result<UserInfo, String> {
        let resp = self
            .authed(self.http.get(self.url("/api/user")))
            .send()
            .await
            .map_err(|e| format!("GetUserInfo failed: {e}"))?;
        resp.error_for_status()
            .map_err(|e| format!("GetUserInfo failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("GetUserInfo: bad response body: {e}"))
    }

    pub fn get_api_endpoint(&self) -> &str {
        &self.base_url
    }

    /// Builds the canonical web URL for a run, used by Dashboard's `o`
    /// (open URL) action on the first detail line (§4.5).
    pub fn run_web_url(&self, run_id: &str) -> String {
        format!("{}/runs/{}", self.base_url.trim_end_matches("/api"), run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_web_url_strips_api_suffix() {
        let client = RepoBirdClient::new("https://api.repobird.ai/api".to_string(), "tok".to_string())
            .expect("client builds");
        assert_eq!(client.run_web_url("abc"), "https://api.repobird.ai/runs/abc");
    }
}
