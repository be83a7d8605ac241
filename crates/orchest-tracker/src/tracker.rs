use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::status::{RunStatus, StatusKind};

/// Relays run and step status to the external tracking service.
///
/// `put_status` is fire-and-forget from the controller's perspective but
/// must complete before the next status for the same entity is issued —
/// callers serialize calls per entity themselves, this trait makes no
/// concurrency guarantee beyond "each call completes or errors".
#[async_trait]
pub trait StatusTracker: Send + Sync {
    async fn put_status(
        &self,
        run_endpoint: &str,
        task_id: &str,
        kind: StatusKind,
        status: RunStatus,
        step_uuid: Option<Uuid>,
    ) -> Result<(), TrackerError>;

    /// The tracker's current record of the pipeline's status. A missing
    /// record (404) is reported as `Ok(RunStatus::Aborted)`, matching the
    /// run controller's exit-condition check.
    async fn get_pipeline_status(&self, run_endpoint: &str, task_id: &str) -> Result<RunStatus, TrackerError>;
}

fn build_url(api_base: &str, run_endpoint: &str, task_id: &str, step_uuid: Option<Uuid>) -> String {
    let api_base = api_base.trim_end_matches('/');
    let run_endpoint = run_endpoint.trim_matches('/');
    match step_uuid {
        Some(uuid) => format!("{api_base}/{run_endpoint}/{task_id}/{uuid}"),
        None => format!("{api_base}/{run_endpoint}/{task_id}"),
    }
}

fn build_body(status: RunStatus, now: DateTime<Utc>) -> Value {
    let mut body = json!({ "status": status });
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
    match status {
        RunStatus::Started => body["started_time"] = json!(timestamp),
        RunStatus::Success | RunStatus::Failure => body["finished_time"] = json!(timestamp),
        RunStatus::Pending | RunStatus::Aborted => {}
    }
    body
}

/// Talks to the tracker over HTTP.
pub struct HttpStatusTracker {
    client: reqwest::Client,
    api_base: String,
}

impl HttpStatusTracker {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl StatusTracker for HttpStatusTracker {
    async fn put_status(
        &self,
        run_endpoint: &str,
        task_id: &str,
        kind: StatusKind,
        status: RunStatus,
        step_uuid: Option<Uuid>,
    ) -> Result<(), TrackerError> {
        let step_uuid = match kind {
            StatusKind::Pipeline => None,
            StatusKind::Step => step_uuid,
        };
        let url = build_url(&self.api_base, run_endpoint, task_id, step_uuid);
        let body = build_body(status, Utc::now());

        let response = self.client.put(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(TrackerError::Status { status: response.status(), url });
        }
        Ok(())
    }

    async fn get_pipeline_status(&self, run_endpoint: &str, task_id: &str) -> Result<RunStatus, TrackerError> {
        let url = build_url(&self.api_base, run_endpoint, task_id, None);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(RunStatus::Aborted);
        }
        if !response.status().is_success() {
            return Err(TrackerError::Status { status: response.status(), url });
        }
        #[derive(serde::Deserialize)]
        struct Record {
            status: RunStatus,
        }
        let record: Record = response.json().await?;
        Ok(record.status)
    }
}
