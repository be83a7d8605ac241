//! HTTP client for the external run/step tracking service.
//!
//! The [`StatusTracker`] trait is the seam the run controller is tested
//! against: production code wires up [`HttpStatusTracker`], tests wire up a
//! scripted fake that records the call sequence.

mod error;
mod status;
mod tracker;

pub use error::TrackerError;
pub use status::{RunStatus, StatusKind};
pub use tracker::{HttpStatusTracker, StatusTracker};
