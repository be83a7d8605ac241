use thiserror::Error;
use uuid::Uuid;

/// `ManifestCompilationFailure` from the error handling design: registry
/// lookup failed, or a step's environment has no registry image.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("registry service discovery lookup for '{service}' in namespace '{namespace}' failed: {source}")]
    RegistryLookupFailed {
        service: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("registry service '{0}' has no cluster IP assigned")]
    RegistryHasNoClusterIp(String),

    #[error("no registry image configured for environment '{0}'")]
    MissingEnvironmentImage(Uuid),
}
