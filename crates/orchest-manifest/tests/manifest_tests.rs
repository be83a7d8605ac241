use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use orchest_graph::Pipeline;
use orchest_manifest::{
    compile_manifest, step_uuid_from_task_name, task_name, CompilerConfig, ManifestError,
    NoopSchedulingPolicy, RegistryResolver, RunConfig, SessionType, RESERVED_ENV_VARS,
};

struct FixedRegistry(&'static str);

#[async_trait]
impl RegistryResolver for FixedRegistry {
    async fn resolve_cluster_ip(&self, _service_name: &str, _namespace: &str) -> Result<String, ManifestError> {
        Ok(self.0.to_string())
    }
}

fn two_step_pipeline() -> (Pipeline, Uuid, Uuid, Uuid) {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let env = Uuid::new_v4();
    let doc = json!({
        "uuid": Uuid::new_v4().to_string(),
        "name": "two step",
        "settings": {},
        "parameters": {},
        "services": {},
        "steps": {
            a.to_string(): {
                "uuid": a.to_string(), "title": "A", "file_path": "a.py",
                "environment": env.to_string(), "incoming_connections": [],
            },
            b.to_string(): {
                "uuid": b.to_string(), "title": "B", "file_path": "b.py",
                "environment": env.to_string(), "incoming_connections": [a.to_string()],
            },
        },
    });
    (Pipeline::from_json(&doc).unwrap(), a, b, env)
}

fn run_config(env: Uuid) -> RunConfig {
    let mut env_uuid_to_image = HashMap::new();
    env_uuid_to_image.insert(env, "project/my-env:latest".to_string());
    RunConfig {
        project_uuid: Uuid::new_v4(),
        pipeline_uuid: Uuid::new_v4(),
        pipeline_path: "pipeline_dir".to_string(),
        project_dir: "my-project".to_string(),
        userdir_pvc: "userdir-pvc-claim".to_string(),
        session_uuid: Uuid::new_v4(),
        session_type: SessionType::Interactive,
        run_endpoint: "runs".to_string(),
        user_env_variables: HashMap::new(),
        env_uuid_to_image,
    }
}

fn compiler_config(single_node: bool) -> CompilerConfig {
    CompilerConfig {
        namespace: "orchest".to_string(),
        cluster: "test-cluster".to_string(),
        host_gid: 1,
        single_node,
        user_containers_cpu_shares: "250m".to_string(),
        registry_service_name: "docker-registry".to_string(),
        environment_as_service_prefix: "environment@".to_string(),
    }
}

/// The pipeline file sits at the project root (the common case), so
/// `working_dir` must be empty and the runnable path must not treat the
/// pipeline file itself as a directory component.
#[tokio::test]
async fn single_node_working_dir_for_root_level_pipeline_file() {
    let (pipeline, a, _b, env) = two_step_pipeline();
    let mut rc = run_config(env);
    rc.pipeline_path = "mypipeline.orchest".to_string();
    let cc = compiler_config(true);
    let manifest = compile_manifest(&pipeline, &rc, &cc, &FixedRegistry("10.0.0.5"), &NoopSchedulingPolicy)
        .await
        .unwrap();

    let containers = manifest["spec"]["templates"][0]["containerSet"]["containers"]
        .as_array()
        .unwrap();
    let a_container = containers
        .iter()
        .find(|c| c["name"] == task_name(a).as_str())
        .unwrap();
    assert_eq!(a_container["workingDir"], "");
    assert_eq!(
        a_container["command"].as_array().unwrap(),
        &vec![json!("/orchest/bootscript.sh"), json!("runnable"), json!(""), json!("a.py")]
    );
}

/// M1 + scenario 4: single-node manifest of a two-step pipeline A->B.
#[tokio::test]
async fn single_node_manifest_has_one_container_set_template() {
    let (pipeline, a, b, env) = two_step_pipeline();
    let rc = run_config(env);
    let cc = compiler_config(true);
    let manifest = compile_manifest(&pipeline, &rc, &cc, &FixedRegistry("10.0.0.5"), &NoopSchedulingPolicy)
        .await
        .unwrap();

    let templates = manifest["spec"]["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 1);
    let containers = templates[0]["containerSet"]["containers"].as_array().unwrap();
    assert_eq!(containers.len(), 2);

    let names: Vec<&str> = containers.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert!(names.contains(&task_name(a).as_str()));
    assert!(names.contains(&task_name(b).as_str()));

    let b_container = containers
        .iter()
        .find(|c| c["name"] == task_name(b).as_str())
        .unwrap();
    assert_eq!(
        b_container["dependencies"].as_array().unwrap(),
        &vec![json!(task_name(a))]
    );
}

/// M3 + scenario 5: multi-node manifest has two templates, the second named "step".
#[tokio::test]
async fn multi_node_manifest_has_dag_and_step_templates() {
    let (pipeline, a, b, env) = two_step_pipeline();
    let rc = run_config(env);
    let cc = compiler_config(false);
    let manifest = compile_manifest(&pipeline, &rc, &cc, &FixedRegistry("10.0.0.5"), &NoopSchedulingPolicy)
        .await
        .unwrap();

    let templates = manifest["spec"]["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[1]["name"], "step");

    let tasks = templates[0]["dag"]["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    for task in tasks {
        assert_eq!(task["template"], "step");
    }

    let b_task = tasks.iter().find(|t| t["name"] == task_name(b).as_str()).unwrap();
    assert_eq!(b_task["dependencies"].as_array().unwrap(), &vec![json!(task_name(a))]);

    let param_names: HashSet<&str> = b_task["arguments"]["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    let expected: HashSet<&str> = [
        "step_uuid",
        "image",
        "working_dir",
        "project_relative_file_path",
        "pod_spec_patch",
        "tests_uuid",
    ]
    .into_iter()
    .collect();
    assert_eq!(param_names, expected);
}

/// M2: user env-vars precede the reserved set, and the reserved set is
/// exactly the eight names in order.
#[tokio::test]
async fn env_var_order_is_user_then_reserved() {
    let (pipeline, _a, b, env) = two_step_pipeline();
    let mut rc = run_config(env);
    rc.user_env_variables.insert("MY_VAR".to_string(), "1".to_string());
    rc.user_env_variables.insert("ANOTHER".to_string(), "2".to_string());
    let cc = compiler_config(true);
    let manifest = compile_manifest(&pipeline, &rc, &cc, &FixedRegistry("10.0.0.5"), &NoopSchedulingPolicy)
        .await
        .unwrap();

    let containers = manifest["spec"]["templates"][0]["containerSet"]["containers"]
        .as_array()
        .unwrap();
    let b_container = containers
        .iter()
        .find(|c| c["name"] == task_name(b).as_str())
        .unwrap();
    let env_names: Vec<String> = b_container["env"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(&env_names[env_names.len() - 8..], RESERVED_ENV_VARS);
    let reserved_start = env_names.len() - 8;
    assert!(env_names[..reserved_start].contains(&"MY_VAR".to_string()));
    assert!(env_names[..reserved_start].contains(&"ANOTHER".to_string()));
}

/// M4: ttlStrategy is 1000 on all three keys.
#[tokio::test]
async fn ttl_strategy_is_1000_everywhere() {
    let (pipeline, _a, _b, env) = two_step_pipeline();
    let rc = run_config(env);
    let cc = compiler_config(true);
    let manifest = compile_manifest(&pipeline, &rc, &cc, &FixedRegistry("10.0.0.5"), &NoopSchedulingPolicy)
        .await
        .unwrap();

    let ttl = &manifest["spec"]["ttlStrategy"];
    assert_eq!(ttl["secondsAfterCompletion"], 1000);
    assert_eq!(ttl["secondsAfterSuccess"], 1000);
    assert_eq!(ttl["secondsAfterFailure"], 1000);
}

#[tokio::test]
async fn missing_environment_image_fails_compilation() {
    let (pipeline, _a, _b, _env) = two_step_pipeline();
    let mut rc = run_config(Uuid::new_v4());
    rc.env_uuid_to_image.clear();
    let cc = compiler_config(true);
    let err = compile_manifest(&pipeline, &rc, &cc, &FixedRegistry("10.0.0.5"), &NoopSchedulingPolicy)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::MissingEnvironmentImage(_)));
}

#[test]
fn task_name_round_trips_through_step_uuid_from_task_name() {
    let uuid = Uuid::new_v4();
    let name = task_name(uuid);
    assert_eq!(step_uuid_from_task_name(&name), Some(uuid));
    assert_eq!(step_uuid_from_task_name("not-a-step-name"), None);
}
