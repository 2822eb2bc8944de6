use common::{
    DoneResponse, JobStatus, TaskAssignment, TaskCompleteRequest, TaskCompleteResponse,
    TaskFailedRequest, TaskFailedResponse, TaskId, TaskRequest,
};
use reqwest::Client;

/// Thin typed wrapper over the coordinator's HTTP endpoints.
///
/// Any error (connection refused, non-2xx status, undecodable body) means
/// the call failed outright; callers decide what that implies.
#[derive(Clone)]
pub struct CoordinatorClient {
    http: Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request_task(&self, worker_id: &str) -> reqwest::Result<TaskAssignment> {
        let url = format!("{}/api/v1/tasks/request", self.base_url);
        self.http
            .post(&url)
            .json(&TaskRequest::new(worker_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Returns whether the coordinator accepted the completion.
    pub async fn report_done(&self, worker_id: &str, task: TaskId) -> reqwest::Result<bool> {
        let url = format!("{}/api/v1/tasks/complete", self.base_url);
        let resp: TaskCompleteResponse = self
            .http
            .post(&url)
            .json(&TaskCompleteRequest {
                worker_id: worker_id.to_string(),
                kind: task.kind,
                task_index: task.index,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.accepted)
    }

    pub async fn report_failed(
        &self,
        worker_id: &str,
        task: TaskId,
        reason: String,
    ) -> reqwest::Result<bool> {
        let url = format!("{}/api/v1/tasks/failed", self.base_url);
        let resp: TaskFailedResponse = self
            .http
            .post(&url)
            .json(&TaskFailedRequest {
                worker_id: worker_id.to_string(),
                kind: task.kind,
                task_index: task.index,
                reason,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.released)
    }

    pub async fn done(&self) -> reqwest::Result<bool> {
        let url = format!("{}/api/v1/job/done", self.base_url);
        let resp: DoneResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.done)
    }

    pub async fn status(&self) -> reqwest::Result<JobStatus> {
        let url = format!("{}/api/v1/job", self.base_url);
        self.http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
