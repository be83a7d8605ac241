use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// An auxiliary sidecar container attached to a pipeline.
///
/// A service's `image` is either a registry reference or, when prefixed
/// with the environment-as-service sentinel, a pointer to a user
/// environment image by UUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    /// If `image` is prefixed with `prefix`, returns the environment UUID it
    /// references. Returns `None` for services backed by a plain registry
    /// image, and for a prefixed image whose suffix is not a valid UUID.
    pub fn environment_uuid(&self, prefix: &str) -> Option<Uuid> {
        self.image
            .strip_prefix(prefix)
            .and_then(|suffix| Uuid::parse_str(suffix).ok())
    }
}
