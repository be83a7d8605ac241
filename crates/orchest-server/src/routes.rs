use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use orchest_engine::RunDeps;
use orchest_graph::Pipeline;
use orchest_manifest::{NoopSchedulingPolicy, RunConfig, SessionType};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/pipeline-runs", post(create_pipeline_run))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness_check() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

/// Wire shape of `RunConfig`; `session_type` and `env_uuid_to_image`'s keys
/// need validation `RunConfig` itself doesn't carry (it's an internal type,
/// built once here at the HTTP boundary).
#[derive(Debug, Deserialize)]
struct RunConfigBody {
    project_uuid: Uuid,
    pipeline_uuid: Uuid,
    pipeline_path: String,
    project_dir: String,
    userdir_pvc: String,
    session_uuid: Uuid,
    session_type: String,
    run_endpoint: String,
    #[serde(default)]
    user_env_variables: HashMap<String, String>,
    #[serde(default)]
    env_uuid_to_image: HashMap<String, String>,
}

impl RunConfigBody {
    fn into_run_config(self) -> Result<RunConfig, ApiError> {
        let session_type = match self.session_type.as_str() {
            "interactive" => SessionType::Interactive,
            "non-interactive" => SessionType::NonInteractive,
            other => {
                return Err(ApiError::bad_request(format!(
                    "session_type must be 'interactive' or 'non-interactive', got '{other}'"
                )))
            }
        };

        let mut env_uuid_to_image = HashMap::with_capacity(self.env_uuid_to_image.len());
        for (uuid, image) in self.env_uuid_to_image {
            let uuid = Uuid::parse_str(&uuid)
                .map_err(|e| ApiError::bad_request(format!("invalid environment uuid '{uuid}': {e}")))?;
            env_uuid_to_image.insert(uuid, image);
        }

        Ok(RunConfig {
            project_uuid: self.project_uuid,
            pipeline_uuid: self.pipeline_uuid,
            pipeline_path: self.pipeline_path,
            project_dir: self.project_dir,
            userdir_pvc: self.userdir_pvc,
            session_uuid: self.session_uuid,
            session_type,
            run_endpoint: self.run_endpoint,
            user_env_variables: self.user_env_variables,
            env_uuid_to_image,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PipelineRunRequest {
    task_id: String,
    pipeline: Value,
    run_config: RunConfigBody,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn create_pipeline_run(
    State(state): State<AppState>,
    Json(request): Json<PipelineRunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = Pipeline::from_json(&request.pipeline)
        .map_err(|e| ApiError::bad_request(format!("invalid pipeline description: {e}")))?;
    let run_config = request.run_config.into_run_config()?;

    let task_id = request.task_id;
    let session_uuid = run_config.session_uuid;
    let compiler_config = state.compiler_config.clone();
    let controller_config = state.controller_config;
    let registry_resolver = state.registry_resolver.clone();
    let engine = state.engine.clone();
    let tracker = state.tracker.clone();
    let cancellation = state.cancellation.clone();

    let spawned_task_id = task_id.clone();
    tokio::spawn(async move {
        let deps = RunDeps {
            registry_resolver: registry_resolver.as_ref(),
            scheduling_policy: &NoopSchedulingPolicy,
            engine: engine.as_ref(),
            tracker: tracker.as_ref(),
            cancellation: &cancellation,
        };
        let status = orchest_engine::run(
            session_uuid,
            &spawned_task_id,
            &pipeline,
            &run_config,
            &compiler_config,
            &controller_config,
            &deps,
        )
        .await;
        tracing::info!(task_id = %spawned_task_id, ?status, "pipeline run finished");
        cancellation.forget(&spawned_task_id);
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "task_id": task_id }))))
}
