use std::sync::Arc;
use std::time::Duration;

use orchest_config::Config;
use orchest_engine::{CancellationRegistry, ControllerConfig, KubeWorkflowEngineClient, WorkflowEngineClient};
use orchest_manifest::{CompilerConfig, KubeRegistryResolver, RegistryResolver};
use orchest_tracker::{HttpStatusTracker, StatusTracker};

/// Shared, cloneable handle to every collaborator the run controller needs.
/// Cheap to clone: everything inside is an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub registry_resolver: Arc<dyn RegistryResolver>,
    pub engine: Arc<dyn WorkflowEngineClient>,
    pub tracker: Arc<dyn StatusTracker>,
    pub cancellation: CancellationRegistry,
    pub compiler_config: CompilerConfig,
    pub controller_config: ControllerConfig,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let kube_client = kube::Client::try_default().await?;
        let http_client = reqwest::Client::new();

        Ok(Self {
            registry_resolver: Arc::new(KubeRegistryResolver::new(kube_client.clone())),
            engine: Arc::new(KubeWorkflowEngineClient::new(kube_client, &config.orchest_namespace)),
            tracker: Arc::new(HttpStatusTracker::new(http_client, config.orchest_api_address.clone())),
            cancellation: CancellationRegistry::new(),
            compiler_config: config.compiler_config(),
            controller_config: ControllerConfig { poll_interval: Duration::from_millis(250) },
        })
    }
}
