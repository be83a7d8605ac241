use thiserror::Error;

use orchest_manifest::ManifestError;

/// Error kinds from the error handling design (§7). `InvalidPipeline` is
/// raised by `orchest_graph` before a run ever reaches this crate, so it
/// has no variant here.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("manifest compilation failed: {0}")]
    ManifestCompilationFailure(#[from] ManifestError),

    #[error("workflow engine rejected the submission: {0}")]
    EngineSubmissionFailure(String),

    #[error("polling the workflow engine failed: {0}")]
    EnginePollFailure(String),

    #[error("engine returned a node record missing an expected identifying field: {0}")]
    MalformedEngineState(String),
}
