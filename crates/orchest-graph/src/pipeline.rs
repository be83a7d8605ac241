use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::GraphError;
use crate::service::Service;
use crate::step::{Step, StepProperties};

/// A parsed pipeline DAG.
///
/// Steps are owned by the pipeline's arena (`steps`); adjacency between them
/// is expressed as UUID sets rather than object references, see
/// [`crate::Step`]. A `uuid -> index` side table keeps `get_step` O(1) in
/// practice, though the contract only promises "acceptable for a few
/// hundred steps".
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub uuid: Uuid,
    pub name: String,
    pub version: Option<String>,
    pub settings: Map<String, Value>,
    pub parameters: Map<String, Value>,
    pub services: HashMap<String, Service>,
    steps: Vec<Step>,
    index: HashMap<Uuid, usize>,
}

impl Pipeline {
    fn from_steps(
        uuid: Uuid,
        name: String,
        version: Option<String>,
        settings: Map<String, Value>,
        parameters: Map<String, Value>,
        services: HashMap<String, Service>,
        steps: Vec<Step>,
    ) -> Self {
        let index = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.uuid(), i))
            .collect();
        Self {
            uuid,
            name,
            version,
            settings,
            parameters,
            services,
            steps,
            index,
        }
    }

    /// Builds a pipeline from its JSON description.
    ///
    /// Builds the uuid -> step map first, then populates `parents` and
    /// `children` in a second pass so forward references resolve, then runs
    /// a DFS to reject cycles.
    pub fn from_json(description: &Value) -> Result<Self, GraphError> {
        let obj = description
            .as_object()
            .ok_or_else(|| GraphError::Malformed("pipeline description must be an object".into()))?;

        let uuid = obj
            .get("uuid")
            .and_then(Value::as_str)
            .ok_or(GraphError::MissingField("uuid"))?;
        let uuid = Uuid::parse_str(uuid)
            .map_err(|e| GraphError::Malformed(format!("invalid pipeline uuid: {e}")))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or(GraphError::MissingField("name"))?
            .to_string();

        let version = obj
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let settings = obj
            .get("settings")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let parameters = obj
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let services = match obj.get("services") {
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| GraphError::Malformed(format!("invalid services: {e}")))?,
            None => HashMap::new(),
        };

        let steps_obj = obj
            .get("steps")
            .and_then(Value::as_object)
            .ok_or(GraphError::MissingField("steps"))?;

        // First pass: build the uuid -> Step map without adjacency.
        let mut steps: HashMap<Uuid, Step> = HashMap::with_capacity(steps_obj.len());
        for (key, value) in steps_obj {
            let properties: StepProperties = serde_json::from_value(value.clone())
                .map_err(|e| GraphError::Malformed(format!("invalid step '{key}': {e}")))?;
            steps.insert(properties.uuid, Step::new(properties));
        }

        // Second pass: populate parents/children now that every uuid resolves.
        let incoming: Vec<(Uuid, Vec<Uuid>)> = steps
            .values()
            .map(|s| (s.uuid(), s.properties.incoming_connections.clone()))
            .collect();
        for (step_uuid, parents) in incoming {
            for parent_uuid in parents {
                if !steps.contains_key(&parent_uuid) {
                    return Err(GraphError::UnknownParent {
                        step: step_uuid,
                        parent: parent_uuid,
                    });
                }
                steps.get_mut(&step_uuid).unwrap().parents.insert(parent_uuid);
                steps.get_mut(&parent_uuid).unwrap().children.insert(step_uuid);
            }
        }

        detect_cycle(&steps)?;

        let steps: Vec<Step> = steps.into_values().collect();
        Ok(Self::from_steps(
            uuid, name, version, settings, parameters, services, steps,
        ))
    }

    /// The inverse of `from_json`, up to key presence: `parents`/`children`
    /// are not serialized, they are re-derived from `incoming_connections`.
    pub fn to_dict(&self) -> Value {
        let mut steps_obj = Map::with_capacity(self.steps.len());
        for step in &self.steps {
            let props = serde_json::to_value(&step.properties).expect("StepProperties always serializes");
            steps_obj.insert(step.uuid().to_string(), props);
        }

        let mut root = Map::new();
        root.insert("uuid".into(), Value::String(self.uuid.to_string()));
        root.insert("name".into(), Value::String(self.name.clone()));
        if let Some(version) = &self.version {
            root.insert("version".into(), Value::String(version.clone()));
        }
        root.insert("settings".into(), Value::Object(self.settings.clone()));
        root.insert("parameters".into(), Value::Object(self.parameters.clone()));
        root.insert(
            "services".into(),
            serde_json::to_value(&self.services).expect("Service always serializes"),
        );
        root.insert("steps".into(), Value::Object(steps_obj));
        Value::Object(root)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Direct lookup by uuid. O(1) via the side index, unlike the linear
    /// scan the contract merely requires.
    pub fn get_step(&self, uuid: Uuid) -> Result<&Step, GraphError> {
        self.index
            .get(&uuid)
            .map(|&i| &self.steps[i])
            .ok_or(GraphError::StepNotFound(uuid))
    }

    /// The set of environment UUIDs referenced by steps and by services
    /// backed by an environment image.
    pub fn get_environments(&self, environment_as_service_prefix: &str) -> HashSet<Uuid> {
        let mut envs: HashSet<Uuid> = self.steps.iter().map(|s| s.properties.environment).collect();
        envs.extend(
            self.services
                .values()
                .filter_map(|svc| svc.environment_uuid(environment_as_service_prefix)),
        );
        envs
    }

    pub fn get_params(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// The induced subgraph over `selection`: keep exactly those steps,
    /// dropping adjacency to anything outside the selection and rewriting
    /// `incoming_connections` to match.
    pub fn get_induced_subgraph(&self, selection: &HashSet<Uuid>) -> Self {
        let new_steps: Vec<Step> = self
            .steps
            .iter()
            .filter(|s| selection.contains(&s.uuid()))
            .map(|orig| {
                let mut properties = orig.properties.clone();
                let parents: std::collections::BTreeSet<Uuid> = orig
                    .parents()
                    .copied()
                    .filter(|p| selection.contains(p))
                    .collect();
                let children: std::collections::BTreeSet<Uuid> = orig
                    .children()
                    .copied()
                    .filter(|c| selection.contains(c))
                    .collect();
                properties.incoming_connections = parents.iter().copied().collect();
                let mut step = Step::new(properties);
                step.parents = parents;
                step.children = children;
                step
            })
            .collect();

        Self::from_steps(
            self.uuid,
            self.name.clone(),
            self.version.clone(),
            self.settings.clone(),
            self.parameters.clone(),
            self.services.clone(),
            new_steps,
        )
    }

    /// In-place variant of `get_induced_subgraph`. Behaviorally identical;
    /// kept only as the call site the original optimized for.
    pub fn convert_to_induced_subgraph(&mut self, selection: &HashSet<Uuid>) {
        *self = self.get_induced_subgraph(selection);
    }

    /// The ancestor closure of `selection`: every step with a directed path
    /// to some element of the selection, plus the selection itself when
    /// `inclusive`.
    ///
    /// Both the vertex set and every kept step's adjacency are computed
    /// against the *finalized* included set, so adjacency symmetry (every
    /// parent/child pair where both ends are in the result) holds
    /// regardless of traversal order.
    pub fn incoming(&self, selection: &HashSet<Uuid>, inclusive: bool) -> Self {
        let seeds: Vec<Uuid> = self
            .steps
            .iter()
            .map(Step::uuid)
            .filter(|u| selection.contains(u))
            .collect();

        let mut closure: HashSet<Uuid> = HashSet::new();
        let mut stack = seeds;
        while let Some(uuid) = stack.pop() {
            if !closure.insert(uuid) {
                continue;
            }
            if let Ok(step) = self.get_step(uuid) {
                stack.extend(step.parents().copied());
            }
        }

        let included: HashSet<Uuid> = if inclusive {
            closure
        } else {
            closure.difference(selection).copied().collect()
        };

        let new_steps: Vec<Step> = included
            .iter()
            .map(|&uuid| {
                let orig = self.get_step(uuid).expect("closure only contains known steps");
                let mut properties = orig.properties.clone();
                let parents: std::collections::BTreeSet<Uuid> = orig
                    .parents()
                    .copied()
                    .filter(|p| included.contains(p))
                    .collect();
                let children: std::collections::BTreeSet<Uuid> = orig
                    .children()
                    .copied()
                    .filter(|c| included.contains(c))
                    .collect();
                properties.incoming_connections = parents.iter().copied().collect();
                let mut step = Step::new(properties);
                step.parents = parents;
                step.children = children;
                step
            })
            .collect();

        Self::from_steps(
            self.uuid,
            self.name.clone(),
            self.version.clone(),
            self.settings.clone(),
            self.parameters.clone(),
            self.services.clone(),
            new_steps,
        )
    }
}

/// White/gray/black DFS cycle detection over the parent relation.
fn detect_cycle(steps: &HashMap<Uuid, Step>) -> Result<(), GraphError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: HashMap<Uuid, Color> = steps.keys().map(|&u| (u, Color::White)).collect();

    fn visit(
        uuid: Uuid,
        steps: &HashMap<Uuid, Step>,
        color: &mut HashMap<Uuid, Color>,
    ) -> Result<(), GraphError> {
        color.insert(uuid, Color::Gray);
        for &parent in steps[&uuid].parents() {
            match color[&parent] {
                Color::White => visit(parent, steps, color)?,
                Color::Gray => return Err(GraphError::Cycle(uuid)),
                Color::Black => {}
            }
        }
        color.insert(uuid, Color::Black);
        Ok(())
    }

    for &uuid in steps.keys() {
        if color[&uuid] == Color::White {
            visit(uuid, steps, &mut color)?;
        }
    }
    Ok(())
}
