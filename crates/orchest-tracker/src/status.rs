use serde::{Deserialize, Serialize};

/// The entity a status update is about — `put_status`'s `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pipeline,
    Step,
}

/// The shared status set for both pipelines and steps. `Success`,
/// `Failure`, and `Aborted` are terminal; nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pending,
    Started,
    Success,
    Failure,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failure | RunStatus::Aborted)
    }
}
