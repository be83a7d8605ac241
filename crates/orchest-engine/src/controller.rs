use std::collections::HashSet;
use std::time::Duration;

use orchest_graph::{Pipeline, Step};
use orchest_manifest::{compile_manifest, CompilerConfig, RegistryResolver, RunConfig, SchedulingPolicy};
use orchest_tracker::{RunStatus, StatusKind, StatusTracker};
use serde_json::json;
use uuid::Uuid;

use crate::cancellation::CancellationProbe;
use crate::error::ControllerError;
use crate::node_state::compute_updates;
use crate::workflow_client::WorkflowEngineClient;

/// The external collaborators the run controller is driven against. Bundled
/// so `run` doesn't grow an ever-longer positional argument list; production
/// code wires up the `Http`/`Kube`-backed implementations, tests wire up
/// scripted fakes.
pub struct RunDeps<'a> {
    pub registry_resolver: &'a dyn RegistryResolver,
    pub scheduling_policy: &'a dyn SchedulingPolicy,
    pub engine: &'a dyn WorkflowEngineClient,
    pub tracker: &'a dyn StatusTracker,
    pub cancellation: &'a dyn CancellationProbe,
}

/// Controller-specific knobs independent of a single run's configuration.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Poll period against the workflow engine. 250ms by default;
    /// overridable so tests don't pay a real-time wait per iteration.
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(250) }
    }
}

fn workflow_name(task_id: &str) -> String {
    format!("pipeline-run-task-{task_id}")
}

async fn emit_step_status(
    tracker: &dyn StatusTracker,
    run_endpoint: &str,
    task_id: &str,
    step_uuid: Uuid,
    status: RunStatus,
) {
    if let Err(err) = tracker
        .put_status(run_endpoint, task_id, StatusKind::Step, status, Some(step_uuid))
        .await
    {
        tracing::warn!(error = %err, task_id, %step_uuid, ?status, "tracker unavailable for step status update");
    }
}

async fn emit_pipeline_status(tracker: &dyn StatusTracker, run_endpoint: &str, task_id: &str, status: RunStatus) {
    if let Err(err) = tracker
        .put_status(run_endpoint, task_id, StatusKind::Pipeline, status, None)
        .await
    {
        tracing::warn!(error = %err, task_id, ?status, "tracker unavailable for pipeline status update");
    }
}

/// Submits the manifest and drives the poll loop until an exit condition
/// (§4.5 step 5) is reached. Any collaborator failure propagates to the
/// caller, which performs the shared finalization (§7's catch-all path).
#[allow(clippy::too_many_arguments)]
async fn drive(
    session_uuid: Uuid,
    task_id: &str,
    pipeline: &Pipeline,
    run_config: &RunConfig,
    compiler_config: &CompilerConfig,
    controller_config: &ControllerConfig,
    deps: &RunDeps<'_>,
    steps_to_start: &mut HashSet<Uuid>,
    steps_to_finish: &mut HashSet<Uuid>,
    had_failed: &mut bool,
) -> Result<(), ControllerError> {
    let mut manifest = compile_manifest(
        pipeline,
        run_config,
        compiler_config,
        deps.registry_resolver,
        deps.scheduling_policy,
    )
    .await?;

    let name = workflow_name(task_id);
    manifest["metadata"] = json!({
        "name": name,
        "labels": {
            "project_uuid": run_config.project_uuid.to_string(),
            "session_uuid": session_uuid.to_string(),
        },
    });

    deps.engine.submit(manifest).await?;

    loop {
        let nodes = deps.engine.get_status_nodes(&name).await?;
        let updates = compute_updates(
            &nodes,
            compiler_config.single_node,
            pipeline,
            steps_to_start,
            steps_to_finish,
        )?;

        for (step_uuid, status) in updates {
            if status == RunStatus::Failure {
                *had_failed = true;
            }
            if status.is_terminal() {
                steps_to_finish.remove(&step_uuid);
                steps_to_start.remove(&step_uuid);
            } else {
                steps_to_start.remove(&step_uuid);
            }
            emit_step_status(deps.tracker, &run_config.run_endpoint, task_id, step_uuid, status).await;
        }

        if steps_to_finish.is_empty() || *had_failed {
            break;
        }
        if deps.cancellation.is_aborted(task_id) {
            break;
        }

        match deps.tracker.get_pipeline_status(&run_config.run_endpoint, task_id).await {
            Ok(status) if status.is_terminal() => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, task_id, "tracker unavailable while polling run status");
            }
        }

        tokio::time::sleep(controller_config.poll_interval).await;
    }

    Ok(())
}

/// Drives one pipeline run to completion: submits the compiled manifest,
/// polls the workflow engine, relays step/pipeline status to the tracker,
/// and guarantees every step reaches a terminal state before returning.
///
/// Never panics and never propagates a collaborator error — every failure
/// kind in the error handling design is caught once here and folded into
/// the same finalization sequence the cancellation path uses. The returned
/// `RunStatus` is the final pipeline status that was emitted to the
/// tracker.
pub async fn run(
    session_uuid: Uuid,
    task_id: &str,
    pipeline: &Pipeline,
    run_config: &RunConfig,
    compiler_config: &CompilerConfig,
    controller_config: &ControllerConfig,
    deps: &RunDeps<'_>,
) -> RunStatus {
    emit_pipeline_status(deps.tracker, &run_config.run_endpoint, task_id, RunStatus::Started).await;

    let mut steps_to_finish: HashSet<Uuid> = pipeline.steps().iter().map(Step::uuid).collect();
    let mut steps_to_start: HashSet<Uuid> = steps_to_finish.clone();
    let mut had_failed = false;

    if let Err(err) = drive(
        session_uuid,
        task_id,
        pipeline,
        run_config,
        compiler_config,
        controller_config,
        deps,
        &mut steps_to_start,
        &mut steps_to_finish,
        &mut had_failed,
    )
    .await
    {
        tracing::error!(error = %err, task_id, "pipeline run ended abnormally; finalizing as failed");
        had_failed = true;
    }

    for step_uuid in steps_to_finish.iter().copied().collect::<Vec<_>>() {
        emit_step_status(deps.tracker, &run_config.run_endpoint, task_id, step_uuid, RunStatus::Aborted).await;
    }

    let final_status = if had_failed { RunStatus::Failure } else { RunStatus::Success };
    emit_pipeline_status(deps.tracker, &run_config.run_endpoint, task_id, final_status).await;
    final_status
}
