use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The properties of a pipeline step as they round-trip through JSON.
///
/// Only the fields the orchestrator actually reads are named explicitly;
/// everything else the pipeline editor attaches to a step (its canvas
/// position, notes, parameter schema, ...) is retained verbatim in `extra`
/// so that [`crate::Pipeline::to_dict`] reproduces it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProperties {
    pub uuid: Uuid,
    pub title: String,
    pub file_path: String,
    pub environment: Uuid,
    pub incoming_connections: Vec<Uuid>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A node in a [`crate::Pipeline`].
///
/// Adjacency is kept as two sets of UUIDs rather than shared references:
/// steps are owned by the `Pipeline` arena (`Pipeline::steps`), and any
/// transform that needs to walk parents/children looks them up through
/// `Pipeline::get_step`. This sidesteps the back-reference cycles the
/// original object graph has, at the cost of one hash lookup per hop.
#[derive(Debug, Clone)]
pub struct Step {
    pub properties: StepProperties,
    pub(crate) parents: BTreeSet<Uuid>,
    pub(crate) children: BTreeSet<Uuid>,
}

impl Step {
    pub(crate) fn new(properties: StepProperties) -> Self {
        Self {
            properties,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.properties.uuid
    }

    /// UUIDs of this step's direct parents (predecessors).
    pub fn parents(&self) -> impl ExactSizeIterator<Item = &Uuid> {
        self.parents.iter()
    }

    /// UUIDs of this step's direct children (successors).
    pub fn children(&self) -> impl ExactSizeIterator<Item = &Uuid> {
        self.children.iter()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.properties.uuid == other.properties.uuid
    }
}

impl Eq for Step {}
