//! Fitness test between pending work and an agent's remaining capacity.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::resources::ResourceSet;

/// Role name for resources not reserved to any role.
pub const UNRESERVED_ROLE: &str = "*";

/// Opaque identity of a work unit awaiting placement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingTaskId(pub String);

impl PendingTaskId {
    /// Create a pending task id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PendingTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Custom executor a task runs under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorSpec {
    /// Executor identity.
    pub executor_id: String,
    /// Resources the executor itself consumes.
    pub resources: ResourceSet,
}

/// A pending work unit as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Work unit identity.
    pub pending_id: PendingTaskId,
    /// Task name used for logging and launch specs.
    pub name: String,
    /// Resources the task consumes.
    pub resources: ResourceSet,
    /// Optional custom executor.
    #[serde(default)]
    pub executor: Option<ExecutorSpec>,
    /// Role whose resources the task must run on; `None` means unreserved only.
    #[serde(default)]
    pub role: Option<String>,
    /// Agent attributes the task requires (exact key/value match).
    #[serde(default)]
    pub required_attributes: BTreeMap<String, String>,
}

impl TaskRequest {
    /// Create a request with no executor, role, or attribute constraints.
    pub fn new(pending_id: impl Into<String>, name: impl Into<String>, resources: ResourceSet) -> Self {
        Self {
            pending_id: PendingTaskId::new(pending_id),
            name: name.into(),
            resources,
            executor: None,
            role: None,
            required_attributes: BTreeMap::new(),
        }
    }

    /// Run the task under a custom executor.
    #[must_use]
    pub fn with_executor(mut self, executor_id: impl Into<String>, resources: ResourceSet) -> Self {
        self.executor = Some(ExecutorSpec {
            executor_id: executor_id.into(),
            resources,
        });
        self
    }

    /// Require resources from `role`.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Require an agent attribute.
    #[must_use]
    pub fn with_required_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.required_attributes.insert(key.into(), value.into());
        self
    }

    /// Executor resources, if the executor declares any.
    #[must_use]
    pub fn executor_resources(&self) -> Option<&ResourceSet> {
        self.executor
            .as_ref()
            .map(|executor| &executor.resources)
            .filter(|resources| !resources.is_empty())
    }

    /// Task plus executor demand.
    #[must_use]
    pub fn total_demand(&self) -> ResourceSet {
        match self.executor_resources() {
            Some(executor) => self.resources.combine(executor),
            None => self.resources.clone(),
        }
    }
}

/// What the matcher knows about one agent during a pass.
#[derive(Debug, Clone, Copy)]
pub struct AgentProfile<'a> {
    /// Capacity still unclaimed in this pass.
    pub resources: &'a ResourceSet,
    /// Roles the offered resources belong to.
    pub roles: &'a BTreeSet<String>,
    /// Agent attributes.
    pub attributes: &'a BTreeMap<String, String>,
    /// Attributes that reserve the agent for specific workloads.
    pub reserved_attributes: &'a BTreeMap<String, String>,
}

/// Outcome of a fitness test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// The task can be placed.
    Fits,
    /// Remaining resources do not cover the task and executor demand.
    Resources,
    /// The offer's roles do not admit the task.
    Role,
    /// A required attribute is missing or different.
    Attributes,
    /// The agent is reserved and the task does not carry the reservation.
    Reserved,
}

/// Full fitness test, reporting the first failing constraint.
#[must_use]
pub fn check_fit(agent: &AgentProfile<'_>, task: &TaskRequest) -> Fit {
    let role_ok = match task.role.as_deref() {
        Some(role) => agent.roles.contains(role),
        None => agent.roles.is_empty() || agent.roles.contains(UNRESERVED_ROLE),
    };
    if !role_ok {
        return Fit::Role;
    }

    let reserved_ok = agent
        .reserved_attributes
        .iter()
        .all(|(key, value)| task.required_attributes.get(key) == Some(value));
    if !reserved_ok {
        return Fit::Reserved;
    }

    let attributes_ok = task
        .required_attributes
        .iter()
        .all(|(key, value)| agent.attributes.get(key) == Some(value));
    if !attributes_ok {
        return Fit::Attributes;
    }

    if !agent.resources.contains(&task.total_demand()) {
        return Fit::Resources;
    }

    Fit::Fits
}

/// True when `task` can be placed on `agent` as it stands.
#[must_use]
pub fn sufficient_for(agent: &AgentProfile<'_>, task: &TaskRequest) -> bool {
    check_fit(agent, task) == Fit::Fits
}
