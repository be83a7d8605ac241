//! Pipeline DAG model and graph transforms.
//!
//! A [`Pipeline`] owns its [`Step`]s in a flat arena and indexes them by
//! UUID; adjacency between steps is a pair of UUID sets rather than shared
//! references, so the transforms in this crate (`get_induced_subgraph`,
//! `incoming`) can build a new pipeline by cloning properties and recomputing
//! adjacency, with no `Rc<RefCell<_>>` bookkeeping.

mod error;
mod pipeline;
mod service;
mod step;

pub use error::GraphError;
pub use pipeline::Pipeline;
pub use service::Service;
pub use step::{Step, StepProperties};
