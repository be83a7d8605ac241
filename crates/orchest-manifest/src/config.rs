use std::collections::HashMap;

use uuid::Uuid;

/// Whether a run's session is held open for interactive use (a pipeline
/// editor session) or is a one-shot non-interactive run (a scheduled job).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Interactive,
    NonInteractive,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Interactive => "interactive",
            SessionType::NonInteractive => "non-interactive",
        }
    }
}

/// Everything the caller must supply about a single run; independent of
/// process-wide configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_uuid: Uuid,
    pub pipeline_uuid: Uuid,
    pub pipeline_path: String,
    pub project_dir: String,
    pub userdir_pvc: String,
    pub session_uuid: Uuid,
    pub session_type: SessionType,
    pub run_endpoint: String,
    pub user_env_variables: HashMap<String, String>,
    pub env_uuid_to_image: HashMap<Uuid, String>,
}

/// Process-wide configuration the compiler needs, read once at startup.
///
/// A subset of [`orchest_config`]'s full configuration; kept separate so
/// this crate has no dependency on how that configuration is loaded.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub namespace: String,
    pub cluster: String,
    /// Numeric GID used as `runAsGroup`/`fsGroup`.
    pub host_gid: i64,
    pub single_node: bool,
    pub user_containers_cpu_shares: String,
    /// In-cluster service name for the image registry.
    pub registry_service_name: String,
    pub environment_as_service_prefix: String,
}
