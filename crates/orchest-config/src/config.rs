use orchest_manifest::CompilerConfig;

use crate::error::ConfigError;

/// Process-wide configuration, read once at startup from the environment.
///
/// A `.env` file in the working directory is loaded first, if present, via
/// `dotenvy`; actual process environment variables always take precedence.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the tracking service, e.g. `http://orchest-api/api`.
    pub orchest_api_address: String,
    pub orchest_namespace: String,
    pub orchest_cluster: String,
    /// Numeric GID used as `runAsGroup`/`fsGroup` for step pods. Default 1.
    pub orchest_host_gid: i64,
    /// Selects the manifest shape: single `containerSet` vs. DAG-of-pods.
    pub single_node: bool,
    pub user_containers_cpu_shares: String,
    /// In-cluster service name for the image registry.
    pub registry: String,
    /// Sentinel prefix marking a service image as environment-backed.
    pub environment_as_service_prefix: String,
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn env_var_or(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected a boolean (true/false/1/0/yes/no)".to_string(),
        }),
    }
}

impl Config {
    /// Loads configuration from the process environment, applying a `.env`
    /// file first if one is present. Fails fast on a missing or malformed
    /// required variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let single_node_raw = env_var_or("SINGLE_NODE", "false");
        let host_gid_raw = env_var_or("ORCHEST_HOST_GID", "1");

        Ok(Self {
            orchest_api_address: env_var("ORCHEST_API_ADDRESS")?,
            orchest_namespace: env_var("ORCHEST_NAMESPACE")?,
            orchest_cluster: env_var_or("ORCHEST_CLUSTER", "orchest"),
            orchest_host_gid: host_gid_raw.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "ORCHEST_HOST_GID",
                value: host_gid_raw.clone(),
                reason: format!("{e}"),
            })?,
            single_node: parse_bool("SINGLE_NODE", single_node_raw)?,
            user_containers_cpu_shares: env_var_or("USER_CONTAINERS_CPU_SHARES", "100m"),
            registry: env_var_or("REGISTRY", "docker-registry"),
            environment_as_service_prefix: env_var_or(
                "ENVIRONMENT_AS_SERVICE_PREFIX",
                "environment@",
            ),
        })
    }

    /// The subset of this configuration the manifest compiler needs.
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            namespace: self.orchest_namespace.clone(),
            cluster: self.orchest_cluster.clone(),
            host_gid: self.orchest_host_gid,
            single_node: self.single_node,
            user_containers_cpu_shares: self.user_containers_cpu_shares.clone(),
            registry_service_name: self.registry.clone(),
            environment_as_service_prefix: self.environment_as_service_prefix.clone(),
        }
    }
}
