use std::path::Path;

use orchest_graph::{Pipeline, Step};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::{CompilerConfig, RunConfig, SessionType};
use crate::error::ManifestError;
use crate::registry::RegistryResolver;
use crate::scheduling::SchedulingPolicy;
use crate::volumes::derive_volumes;

/// Reserved environment variables appended after the user's own, in this
/// exact order. The runner gives these last-write-wins precedence over a
/// user variable of the same name.
pub const RESERVED_ENV_VARS: [&str; 8] = [
    "ORCHEST_STEP_UUID",
    "ORCHEST_SESSION_UUID",
    "ORCHEST_SESSION_TYPE",
    "ORCHEST_PIPELINE_UUID",
    "ORCHEST_PIPELINE_PATH",
    "ORCHEST_PROJECT_UUID",
    "ORCHEST_NAMESPACE",
    "ORCHEST_CLUSTER",
];

const BOOTSCRIPT_ARGV0: &str = "/orchest/bootscript.sh";

pub fn task_name(uuid: Uuid) -> String {
    format!("step-{uuid}")
}

/// Strips the mandatory `step-` prefix off a task/container name, yielding
/// the step UUID. Returns `None` if the name is not of that shape.
pub fn step_uuid_from_task_name(name: &str) -> Option<Uuid> {
    name.strip_prefix("step-").and_then(|s| Uuid::parse_str(s).ok())
}

/// `project_relative_file_path` and `working_dir`, both pipeline-relative.
///
/// `pipeline_path` names the pipeline *file* itself (e.g.
/// `mypipeline.orchest` or `nested/mypipeline.orchest`), not a directory —
/// so the join is two steps: first take `pipeline_path`'s own dirname, then
/// join that with `file_path`; `working_dir` is the dirname of the result.
fn working_dir_and_file_path(pipeline_path: &str, file_path: &str) -> (String, String) {
    let pipeline_dir = Path::new(pipeline_path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let joined = if pipeline_dir.is_empty() {
        file_path.trim_start_matches('/').to_string()
    } else {
        format!(
            "{}/{}",
            pipeline_dir.trim_end_matches('/'),
            file_path.trim_start_matches('/')
        )
    };
    let working_dir = Path::new(&joined)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    (working_dir, joined)
}

fn resolve_image(
    environment: Uuid,
    run_config: &RunConfig,
    registry_cluster_ip: &str,
) -> Result<String, ManifestError> {
    let image = run_config
        .env_uuid_to_image
        .get(&environment)
        .ok_or(ManifestError::MissingEnvironmentImage(environment))?;
    Ok(format!("{registry_cluster_ip}/{image}"))
}

/// User env-vars first, then the eight reserved ones, in the fixed order.
fn build_env_vars(step: &Step, run_config: &RunConfig, compiler_config: &CompilerConfig) -> Vec<Value> {
    let mut sorted_user: Vec<(&String, &String)> = run_config.user_env_variables.iter().collect();
    sorted_user.sort_by_key(|(name, _)| name.as_str());

    let mut env: Vec<Value> = sorted_user
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let reserved_values = [
        step.uuid().to_string(),
        run_config.session_uuid.to_string(),
        run_config.session_type.as_str().to_string(),
        run_config.pipeline_uuid.to_string(),
        run_config.pipeline_path.clone(),
        run_config.project_uuid.to_string(),
        compiler_config.namespace.clone(),
        compiler_config.cluster.clone(),
    ];
    for (name, value) in RESERVED_ENV_VARS.iter().zip(reserved_values) {
        env.push(json!({ "name": name, "value": value }));
    }
    env
}

/// Dependencies sorted by UUID for reproducible output, per M1.
fn sorted_dependency_names(step: &Step) -> Vec<String> {
    let mut parents: Vec<Uuid> = step.parents().copied().collect();
    parents.sort();
    parents.into_iter().map(task_name).collect()
}

fn pod_spec_patch(compiler_config: &CompilerConfig) -> String {
    let patch = json!({
        "securityContext": {
            "runAsGroup": compiler_config.host_gid,
            "fsGroup": compiler_config.host_gid,
        },
        "containers": [{
            "name": "main",
            "resources": {
                "requests": { "cpu": compiler_config.user_containers_cpu_shares },
            },
        }],
    });
    patch.to_string()
}

fn single_node_container(
    step: &Step,
    run_config: &RunConfig,
    compiler_config: &CompilerConfig,
    registry_cluster_ip: &str,
    volume_mounts: &[Value],
) -> Result<Value, ManifestError> {
    let (working_dir, file_path) = working_dir_and_file_path(&run_config.pipeline_path, &step.properties.file_path);
    let image = resolve_image(step.properties.environment, run_config, registry_cluster_ip)?;
    Ok(json!({
        "name": task_name(step.uuid()),
        "image": image,
        "command": [BOOTSCRIPT_ARGV0, "runnable", working_dir.clone(), file_path],
        "workingDir": working_dir,
        "env": build_env_vars(step, run_config, compiler_config),
        "volumeMounts": volume_mounts,
        "dependencies": sorted_dependency_names(step),
    }))
}

fn multi_node_dag_task(
    step: &Step,
    run_config: &RunConfig,
    compiler_config: &CompilerConfig,
    registry_cluster_ip: &str,
) -> Result<Value, ManifestError> {
    let (working_dir, file_path) = working_dir_and_file_path(&run_config.pipeline_path, &step.properties.file_path);
    let image = resolve_image(step.properties.environment, run_config, registry_cluster_ip)?;
    Ok(json!({
        "name": task_name(step.uuid()),
        "template": "step",
        "dependencies": sorted_dependency_names(step),
        "arguments": {
            "parameters": [
                { "name": "step_uuid", "value": step.uuid().to_string() },
                { "name": "image", "value": image },
                { "name": "working_dir", "value": working_dir },
                { "name": "project_relative_file_path", "value": file_path },
                { "name": "pod_spec_patch", "value": pod_spec_patch(compiler_config) },
                { "name": "tests_uuid", "value": "" },
            ],
        },
    }))
}

/// The shared `"step"` template multi-node manifests reference by name.
/// Accepts the six parameters named in the per-task arguments above and
/// renders them into the runner's argv and env.
fn step_template(run_config: &RunConfig, compiler_config: &CompilerConfig, volume_mounts: &[Value]) -> Value {
    let env: Vec<Value> = {
        let mut sorted_user: Vec<(&String, &String)> = run_config.user_env_variables.iter().collect();
        sorted_user.sort_by_key(|(name, _)| name.as_str());
        let mut env: Vec<Value> = sorted_user
            .into_iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();
        env.push(json!({ "name": "ORCHEST_STEP_UUID", "value": "{{inputs.parameters.step_uuid}}" }));
        env.push(json!({ "name": "ORCHEST_SESSION_UUID", "value": run_config.session_uuid.to_string() }));
        env.push(json!({ "name": "ORCHEST_SESSION_TYPE", "value": run_config.session_type.as_str() }));
        env.push(json!({ "name": "ORCHEST_PIPELINE_UUID", "value": run_config.pipeline_uuid.to_string() }));
        env.push(json!({ "name": "ORCHEST_PIPELINE_PATH", "value": run_config.pipeline_path.clone() }));
        env.push(json!({ "name": "ORCHEST_PROJECT_UUID", "value": run_config.project_uuid.to_string() }));
        env.push(json!({ "name": "ORCHEST_NAMESPACE", "value": compiler_config.namespace.clone() }));
        env.push(json!({ "name": "ORCHEST_CLUSTER", "value": compiler_config.cluster.clone() }));
        env
    };

    json!({
        "name": "step",
        "inputs": {
            "parameters": [
                { "name": "step_uuid" },
                { "name": "image" },
                { "name": "working_dir" },
                { "name": "project_relative_file_path" },
                { "name": "pod_spec_patch" },
                { "name": "tests_uuid" },
            ],
        },
        "podSpecPatch": "{{inputs.parameters.pod_spec_patch}}",
        "container": {
            "image": "{{inputs.parameters.image}}",
            "command": [
                BOOTSCRIPT_ARGV0,
                "runnable",
                "{{inputs.parameters.working_dir}}",
                "{{inputs.parameters.project_relative_file_path}}",
            ],
            "env": env,
            "volumeMounts": volume_mounts,
        },
    })
}

/// Compiles a pipeline into the `spec` half of an Argo `Workflow`.
/// `metadata` (which needs a `task_id` this crate is never given) is the
/// caller's responsibility to attach before submission.
pub async fn compile_manifest(
    pipeline: &Pipeline,
    run_config: &RunConfig,
    compiler_config: &CompilerConfig,
    registry_resolver: &dyn RegistryResolver,
    scheduling_policy: &dyn SchedulingPolicy,
) -> Result<Value, ManifestError> {
    let registry_cluster_ip = registry_resolver
        .resolve_cluster_ip(&compiler_config.registry_service_name, &compiler_config.namespace)
        .await?;

    let (volumes, volume_mounts) = derive_volumes(run_config);

    let templates = if compiler_config.single_node {
        let mut containers = Vec::with_capacity(pipeline.steps().len());
        let mut steps: Vec<&Step> = pipeline.steps().iter().collect();
        steps.sort_by_key(|s| s.uuid());
        for step in steps {
            containers.push(single_node_container(
                step,
                run_config,
                compiler_config,
                &registry_cluster_ip,
                &volume_mounts,
            )?);
        }
        vec![json!({
            "name": "main",
            "containerSet": {
                "containers": containers,
            },
            "imagePullPolicy": "IfNotPresent",
        })]
    } else {
        let mut tasks = Vec::with_capacity(pipeline.steps().len());
        let mut steps: Vec<&Step> = pipeline.steps().iter().collect();
        steps.sort_by_key(|s| s.uuid());
        for step in steps {
            tasks.push(multi_node_dag_task(step, run_config, compiler_config, &registry_cluster_ip)?);
        }
        vec![
            json!({ "name": "main", "dag": { "tasks": tasks } }),
            step_template(run_config, compiler_config, &volume_mounts),
        ]
    };

    let mut manifest = json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Workflow",
        "spec": {
            "entrypoint": "main",
            "volumes": volumes,
            "ttlStrategy": {
                "secondsAfterCompletion": 1000,
                "secondsAfterSuccess": 1000,
                "secondsAfterFailure": 1000,
            },
            "dnsPolicy": "ClusterFirst",
            "dnsConfig": {
                "options": [
                    { "name": "timeout", "value": "10" },
                    { "name": "attempts", "value": "5" },
                ],
            },
            "restartPolicy": "Never",
            "templates": templates,
        },
    });

    if compiler_config.single_node {
        // CPU request applies to the containerSet's containers, set from config.
        if let Some(containers) = manifest["spec"]["templates"][0]["containerSet"]["containers"].as_array_mut() {
            for container in containers {
                container["resources"] = json!({
                    "requests": { "cpu": compiler_config.user_containers_cpu_shares },
                });
            }
        }
    }

    scheduling_policy.modify_scheduling(run_config.session_type, &mut manifest);
    Ok(manifest)
}
