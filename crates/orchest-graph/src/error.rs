use thiserror::Error;
use uuid::Uuid;

/// Errors raised while constructing or validating a [`crate::Pipeline`].
///
/// These are raised by `from_json` before a run is ever submitted; no
/// tracker calls are made for a pipeline that fails to parse.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("pipeline description is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("step '{step}' references unknown parent '{parent}'")]
    UnknownParent { step: Uuid, parent: Uuid },

    #[error("pipeline contains a cycle reachable from step '{0}'")]
    Cycle(Uuid),

    #[error("step with uuid '{0}' not in pipeline")]
    StepNotFound(Uuid),

    #[error("invalid pipeline description: {0}")]
    Malformed(String),
}
