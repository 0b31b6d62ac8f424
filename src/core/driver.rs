//! Egress boundary to the resource manager.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::matching::PendingTaskId;
use crate::core::offer::{AgentId, OfferId};
use crate::core::resources::ResourceSet;

/// Status reported by the resource-manager driver after a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    /// The driver has not been started.
    NotStarted,
    /// The driver is connected and accepted the call.
    Running,
    /// The driver aborted.
    Aborted,
    /// The driver was stopped.
    Stopped,
}

impl DriverStatus {
    /// True when the call was accepted by a running driver.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "DRIVER_NOT_STARTED",
            Self::Running => "DRIVER_RUNNING",
            Self::Aborted => "DRIVER_ABORTED",
            Self::Stopped => "DRIVER_STOPPED",
        };
        f.write_str(name)
    }
}

/// Everything the resource manager needs to start one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Identity assigned to the launched task.
    pub task_id: String,
    /// Work unit this launch fulfils.
    pub pending_id: PendingTaskId,
    /// Human-readable task name.
    pub name: String,
    /// Agent the task is launched on.
    pub agent_id: AgentId,
    /// Resources consumed by the task itself.
    pub resources: ResourceSet,
    /// Executor id and resources, when the task runs under a custom executor.
    pub executor: Option<(String, ResourceSet)>,
}

/// Performs launch and decline calls against the resource manager.
///
/// Implementations own transport, timeouts, and retries of the underlying
/// protocol; the engine calls each method at most once per decision.
pub trait LaunchCommitter: Send + Sync {
    /// Launch `tasks` atomically against every offer in `offer_ids`.
    fn launch_tasks(&self, offer_ids: &[OfferId], tasks: &[LaunchSpec]) -> DriverStatus;

    /// Decline a single offer back to the resource manager.
    fn decline_offer(&self, offer_id: &OfferId) -> DriverStatus;
}

impl<T: LaunchCommitter + ?Sized> LaunchCommitter for Arc<T> {
    fn launch_tasks(&self, offer_ids: &[OfferId], tasks: &[LaunchSpec]) -> DriverStatus {
        (**self).launch_tasks(offer_ids, tasks)
    }

    fn decline_offer(&self, offer_id: &OfferId) -> DriverStatus {
        (**self).decline_offer(offer_id)
    }
}
