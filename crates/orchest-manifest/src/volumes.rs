use serde_json::{json, Value};

use crate::config::RunConfig;

/// Derives the pod-level `volumes` and container-level `volumeMounts` used
/// by every step task: a single mount of the user directory PVC, scoped to
/// this run's project directory via `subPath`.
pub fn derive_volumes(run_config: &RunConfig) -> (Vec<Value>, Vec<Value>) {
    let volumes = vec![json!({
        "name": "userdir-pvc",
        "persistentVolumeClaim": { "claimName": run_config.userdir_pvc },
    })];
    let volume_mounts = vec![json!({
        "name": "userdir-pvc",
        "mountPath": "/userdir",
        "subPath": run_config.project_dir,
    })];
    (volumes, volume_mounts)
}
