//! Drives a single pipeline run from manifest submission to completion:
//! submits the compiled workflow, polls the engine for step status, relays
//! status to the tracker, and honors cancellation.

mod cancellation;
mod controller;
mod error;
mod node_state;
mod workflow_client;

pub use cancellation::{CancellationProbe, CancellationRegistry, NeverCancelled};
pub use controller::{run, ControllerConfig, RunDeps};
pub use error::ControllerError;
pub use workflow_client::{KubeWorkflowEngineClient, WorkflowEngineClient};
