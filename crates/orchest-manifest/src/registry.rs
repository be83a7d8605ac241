use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};

use crate::error::ManifestError;

/// Resolves the in-cluster registry service name to its current cluster IP.
///
/// Looked up once per manifest build; implementations must not cache the
/// result across calls, since the registry's IP can change if the service
/// is recreated.
#[async_trait]
pub trait RegistryResolver: Send + Sync {
    async fn resolve_cluster_ip(&self, service_name: &str, namespace: &str) -> Result<String, ManifestError>;
}

/// Looks the registry service up against the Kubernetes API.
pub struct KubeRegistryResolver {
    client: Client,
}

impl KubeRegistryResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RegistryResolver for KubeRegistryResolver {
    async fn resolve_cluster_ip(&self, service_name: &str, namespace: &str) -> Result<String, ManifestError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let svc = api
            .get(service_name)
            .await
            .map_err(|source| ManifestError::RegistryLookupFailed {
                service: service_name.to_string(),
                namespace: namespace.to_string(),
                source,
            })?;

        svc.spec
            .and_then(|spec| spec.cluster_ip)
            .filter(|ip| ip != "None")
            .ok_or_else(|| ManifestError::RegistryHasNoClusterIp(service_name.to_string()))
    }
}
