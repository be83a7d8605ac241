use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, PostParams};
use kube::{Api, Client};
use serde_json::{Map, Value};

use crate::error::ControllerError;

/// The workflow engine (an Argo Workflows–compatible custom resource):
/// submit a manifest, then poll its `status.nodes` by name.
#[async_trait]
pub trait WorkflowEngineClient: Send + Sync {
    /// Submits `manifest` (already carrying `metadata.name`/`metadata.labels`)
    /// as a new workflow resource.
    async fn submit(&self, manifest: Value) -> Result<(), ControllerError>;

    /// Returns `status.nodes` of the named workflow, or an empty map if the
    /// workflow has no nodes yet.
    async fn get_status_nodes(&self, name: &str) -> Result<Map<String, Value>, ControllerError>;
}

/// Talks to the workflow engine through the Kubernetes API, treating
/// `Workflow` (group `argoproj.io`, version `v1alpha1`) as a dynamic
/// resource so this crate carries no compile-time dependency on Argo's own
/// Rust types.
pub struct KubeWorkflowEngineClient {
    api: Api<DynamicObject>,
}

impl KubeWorkflowEngineClient {
    pub fn new(client: Client, namespace: &str) -> Self {
        let gvk = GroupVersionKind::gvk("argoproj.io", "v1alpha1", "Workflow");
        let resource = ApiResource::from_gvk(&gvk);
        let api = Api::namespaced_with(client, namespace, &resource);
        Self { api }
    }
}

#[async_trait]
impl WorkflowEngineClient for KubeWorkflowEngineClient {
    async fn submit(&self, manifest: Value) -> Result<(), ControllerError> {
        let object: DynamicObject = serde_json::from_value(manifest)
            .map_err(|e| ControllerError::EngineSubmissionFailure(format!("invalid manifest: {e}")))?;
        self.api
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| ControllerError::EngineSubmissionFailure(e.to_string()))?;
        Ok(())
    }

    async fn get_status_nodes(&self, name: &str) -> Result<Map<String, Value>, ControllerError> {
        let object = self
            .api
            .get(name)
            .await
            .map_err(|e| ControllerError::EnginePollFailure(e.to_string()))?;

        let nodes = object
            .data
            .get("status")
            .and_then(|status| status.get("nodes"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(nodes)
    }
}
