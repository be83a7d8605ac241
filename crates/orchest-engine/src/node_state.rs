use std::collections::HashSet;

use orchest_graph::Pipeline;
use orchest_manifest::step_uuid_from_task_name;
use orchest_tracker::RunStatus;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ControllerError;

/// A step node as surfaced by the workflow engine, independent of which
/// manifest shape produced it.
struct StepNode {
    step_uuid: Uuid,
    phase: String,
    message: String,
}

/// Picks out the step-identifying nodes from `status.nodes`, per the §4.5
/// single-node / multi-node discrimination rules.
fn step_nodes(nodes: &Map<String, Value>, single_node: bool) -> Result<Vec<StepNode>, ControllerError> {
    let mut out = Vec::new();

    for node in nodes.values() {
        let step_uuid = if single_node {
            if node.get("type").and_then(Value::as_str) != Some("Container") {
                continue;
            }
            let display_name = node.get("displayName").and_then(Value::as_str).ok_or_else(|| {
                ControllerError::MalformedEngineState(
                    "Container node is missing `displayName`".to_string(),
                )
            })?;
            step_uuid_from_task_name(display_name).ok_or_else(|| {
                ControllerError::MalformedEngineState(format!(
                    "`displayName` '{display_name}' is not a step task name"
                ))
            })?
        } else {
            if node.get("templateName").and_then(Value::as_str) != Some("step") {
                continue;
            }
            if node.get("type").and_then(Value::as_str) != Some("Pod") {
                continue;
            }
            let Some(inputs) = node.get("inputs") else {
                continue;
            };
            let parameters = inputs.get("parameters").and_then(Value::as_array).ok_or_else(|| {
                ControllerError::MalformedEngineState(
                    "step node's `inputs` is missing `parameters`".to_string(),
                )
            })?;
            let step_uuid_str = parameters
                .iter()
                .find(|p| p.get("name").and_then(Value::as_str) == Some("step_uuid"))
                .and_then(|p| p.get("value"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ControllerError::MalformedEngineState(
                        "step node is missing the `step_uuid` parameter".to_string(),
                    )
                })?;
            Uuid::parse_str(step_uuid_str).map_err(|e| {
                ControllerError::MalformedEngineState(format!("invalid step_uuid '{step_uuid_str}': {e}"))
            })?
        };

        let phase = node
            .get("phase")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let message = node
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        out.push(StepNode { step_uuid, phase, message });
    }

    Ok(out)
}

/// The §4.5 status-update table, for one step node.
fn status_update(
    node: &StepNode,
    pipeline: &Pipeline,
    steps_to_start: &HashSet<Uuid>,
    steps_to_finish: &HashSet<Uuid>,
) -> Option<RunStatus> {
    let pulling = matches!(node.phase.as_str(), "Pending" | "Running")
        && (node.message.contains("ImagePullBackOff") || node.message.contains("ErrImagePull"));
    if pulling {
        return Some(RunStatus::Failure);
    }

    if node.phase == "Running" && steps_to_start.contains(&node.step_uuid) {
        // Only strictly needed in single-node mode; kept in both as a
        // defensive check against engine reordering (§9).
        let step = pipeline.get_step(node.step_uuid).ok()?;
        let parents_not_finishing = step.parents().all(|p| !steps_to_finish.contains(p));
        return parents_not_finishing.then_some(RunStatus::Started);
    }

    if node.phase == "Succeeded" && steps_to_finish.contains(&node.step_uuid) {
        return Some(RunStatus::Success);
    }

    if matches!(node.phase.as_str(), "Failed" | "Error") && steps_to_finish.contains(&node.step_uuid) {
        return Some(RunStatus::Failure);
    }

    None
}

/// Computes the step status updates for one poll iteration, against the
/// tracking sets as they stood at the *start* of the iteration. The caller
/// is responsible for applying each update to `steps_to_start`/
/// `steps_to_finish` before deciding on the next iteration's updates.
pub(crate) fn compute_updates(
    nodes: &Map<String, Value>,
    single_node: bool,
    pipeline: &Pipeline,
    steps_to_start: &HashSet<Uuid>,
    steps_to_finish: &HashSet<Uuid>,
) -> Result<Vec<(Uuid, RunStatus)>, ControllerError> {
    let nodes = step_nodes(nodes, single_node)?;
    Ok(nodes
        .iter()
        .filter_map(|node| status_update(node, pipeline, steps_to_start, steps_to_finish).map(|s| (node.step_uuid, s)))
        .collect())
}
