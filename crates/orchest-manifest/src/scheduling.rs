use serde_json::Value;

use crate::config::SessionType;

/// The node-scheduling policy mutator: a pure manifest post-processor
/// supplied by a collaborator out of scope for this crate. Applied once,
/// as the final step of manifest compilation.
pub trait SchedulingPolicy: Send + Sync {
    fn modify_scheduling(&self, session_type: SessionType, manifest: &mut Value);
}

/// A policy that leaves the manifest untouched; used where no scheduling
/// hints are configured, and in tests.
pub struct NoopSchedulingPolicy;

impl SchedulingPolicy for NoopSchedulingPolicy {
    fn modify_scheduling(&self, _session_type: SessionType, _manifest: &mut Value) {}
}
