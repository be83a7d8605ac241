//! Compiles a [`orchest_graph::Pipeline`] into an Argo Workflows manifest.
//!
//! Two shapes come out of [`compile_manifest`] depending on
//! [`CompilerConfig::single_node`]: a single `containerSet` template, or a
//! `dag` template plus a shared `"step"` template the DAG tasks reference
//! by name.

mod compiler;
mod config;
mod error;
mod registry;
mod scheduling;
mod volumes;

pub use compiler::{compile_manifest, step_uuid_from_task_name, task_name, RESERVED_ENV_VARS};
pub use config::{CompilerConfig, RunConfig, SessionType};
pub use error::ManifestError;
pub use registry::{KubeRegistryResolver, RegistryResolver};
pub use scheduling::{NoopSchedulingPolicy, SchedulingPolicy};
pub use volumes::derive_volumes;
