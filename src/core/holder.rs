//! Per-agent aggregate of offers used to match and launch work in one pass.
//!
//! An [`OfferHolder`] folds every offer a pass checked out for one agent into
//! a single resource pool. Matched tasks shrink that pool; rejected work units
//! are remembered so the pass does not test them against this agent again.
//! The holder ends in exactly one terminal state: `Committed` after a launch
//! or `Released` when nothing matched and its offers go back to the cache.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::core::driver::{DriverStatus, LaunchCommitter, LaunchSpec};
use crate::core::error::{OfferError, OfferResult};
use crate::core::matching::{AgentProfile, PendingTaskId, TaskRequest};
use crate::core::offer::{AgentId, Offer, OfferId};
use crate::core::resources::ResourceSet;
use crate::util::text::replace_hyphens_with_underscores;

/// Lifecycle of a holder within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderState {
    /// Offers and tasks are being accumulated.
    Building,
    /// `launch_tasks` was issued.
    Committed,
    /// Nothing matched; the offers were handed back.
    Released,
}

/// Identity and labels of the agent a holder represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    /// Agent identity.
    pub agent_id: AgentId,
    /// Agent hostname.
    pub hostname: String,
    /// Rack the agent belongs to.
    pub rack_id: String,
    /// Text attributes advertised by the agent.
    pub text_attributes: BTreeMap<String, String>,
    /// Attributes reserving the agent for specific workloads.
    pub reserved_attributes: BTreeMap<String, String>,
}

impl AgentDescriptor {
    /// Describe the agent behind `offer`.
    ///
    /// The rack is read from `rack_attribute_key`, falling back to
    /// `default_rack_id`. Any offer attribute that equals an entry of
    /// `reserved` marks the agent as reserved.
    #[must_use]
    pub fn from_offer(
        offer: &Offer,
        rack_attribute_key: &str,
        default_rack_id: &str,
        reserved: &BTreeMap<String, String>,
    ) -> Self {
        let rack_id = offer
            .attributes
            .get(rack_attribute_key)
            .cloned()
            .unwrap_or_else(|| default_rack_id.to_string());
        let reserved_attributes = reserved
            .iter()
            .filter(|(key, value)| offer.attributes.get(*key) == Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            agent_id: offer.agent_id.clone(),
            hostname: offer.hostname.clone(),
            rack_id,
            text_attributes: offer.attributes.clone(),
            reserved_attributes,
        }
    }
}

/// A task accepted by a holder, ready to be launched.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedTask {
    /// Identity assigned to the launched task.
    pub task_id: String,
    /// The request that was matched.
    pub request: TaskRequest,
}

/// Result of a launch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchReport {
    /// Agent the tasks were launched on.
    pub agent_id: AgentId,
    /// Offers consumed by the launch.
    pub offer_ids: Vec<OfferId>,
    /// Launched task ids.
    pub task_ids: Vec<String>,
    /// Work units fulfilled by the launch.
    pub pending_ids: Vec<PendingTaskId>,
    /// Status reported by the driver.
    pub status: DriverStatus,
}

/// Offers from one agent, bound into one pool for a single scheduling pass.
#[derive(Debug)]
pub struct OfferHolder {
    offers: Vec<Offer>,
    accepted_tasks: Vec<MatchedTask>,
    rejected_pending_task_ids: HashSet<PendingTaskId>,
    current_resources: ResourceSet,
    roles: BTreeSet<String>,
    agent: AgentDescriptor,
    sanitized_host: String,
    sanitized_rack_id: String,
    state: HolderState,
}

impl OfferHolder {
    /// Bind `offers` for `agent`.
    ///
    /// # Errors
    ///
    /// [`OfferError::IntegrityViolation`] if `offers` is empty, if any offer
    /// belongs to a different agent, or if the offers disagree on roles.
    pub fn new(offers: Vec<Offer>, task_size_hint: usize, agent: AgentDescriptor) -> OfferResult<Self> {
        let Some(first) = offers.first() else {
            return Err(OfferError::IntegrityViolation(format!(
                "holder for agent {} built without offers",
                agent.agent_id
            )));
        };
        if let Some(stray) = offers.iter().find(|offer| offer.agent_id != agent.agent_id) {
            return Err(OfferError::IntegrityViolation(format!(
                "offer {} belongs to agent {}, not {}",
                stray.id, stray.agent_id, agent.agent_id
            )));
        }
        let roles = first.roles.clone();
        if let Some(odd) = offers.iter().find(|offer| offer.roles != roles) {
            return Err(OfferError::IntegrityViolation(format!(
                "offer {} on agent {} has roles {:?}, expected {:?}",
                odd.id, agent.agent_id, odd.roles, roles
            )));
        }

        let current_resources = if offers.len() > 1 {
            ResourceSet::combine_all(offers.iter().map(|offer| &offer.resources))
        } else {
            first.resources.clone()
        };

        Ok(Self {
            sanitized_host: replace_hyphens_with_underscores(&agent.hostname),
            sanitized_rack_id: replace_hyphens_with_underscores(&agent.rack_id),
            offers,
            accepted_tasks: Vec::with_capacity(task_size_hint),
            rejected_pending_task_ids: HashSet::new(),
            current_resources,
            roles,
            agent,
            state: HolderState::Building,
        })
    }

    /// Matching view of the agent as it currently stands.
    #[must_use]
    pub fn profile(&self) -> AgentProfile<'_> {
        AgentProfile {
            resources: &self.current_resources,
            roles: &self.roles,
            attributes: &self.agent.text_attributes,
            reserved_attributes: &self.agent.reserved_attributes,
        }
    }

    /// Remember that `pending_id` does not fit this agent for the rest of the pass.
    pub fn add_rejected_task(&mut self, pending_id: PendingTaskId) {
        self.rejected_pending_task_ids.insert(pending_id);
    }

    /// True if `pending_id` was already rejected by this holder.
    #[must_use]
    pub fn has_rejected_pending_task_already(&self, pending_id: &PendingTaskId) -> bool {
        self.rejected_pending_task_ids.contains(pending_id)
    }

    /// Accept `task`, subtracting its own and its executor's resources.
    ///
    /// The caller must have checked fitness first.
    ///
    /// # Errors
    ///
    /// [`OfferError::IntegrityViolation`] once the holder is no longer
    /// building; [`OfferError::InsufficientResources`] if the task does not
    /// fit after all, in which case nothing is changed.
    pub fn add_matched_task(&mut self, task: TaskRequest) -> OfferResult<&MatchedTask> {
        self.ensure_building("match a task")?;

        let mut remaining = self.current_resources.subtract(&task.resources)?;
        if let Some(executor) = task.executor_resources() {
            remaining = remaining.subtract(executor)?;
        }

        let task_id = format!(
            "{}-{}-{}",
            task.pending_id,
            self.sanitized_host,
            Uuid::new_v4().simple()
        );
        trace!(
            task = %task_id,
            offers = ?self.offer_ids(),
            remaining = %remaining,
            "accepting task"
        );

        self.current_resources = remaining;
        self.accepted_tasks.push(MatchedTask {
            task_id,
            request: task,
        });
        let index = self.accepted_tasks.len() - 1;
        Ok(&self.accepted_tasks[index])
    }

    /// Drop offers the cache reported as gone and re-check the matched tasks.
    ///
    /// # Errors
    ///
    /// [`OfferError::IntegrityViolation`] if every offer is gone, or
    /// [`OfferError::InsufficientResources`] if the surviving offers no
    /// longer cover the accepted tasks. The holder is unchanged on error.
    pub fn drop_offers(&mut self, gone: &HashSet<OfferId>) -> OfferResult<()> {
        self.ensure_building("drop offers")?;
        if gone.is_empty() {
            return Ok(());
        }

        let surviving: Vec<Offer> = self
            .offers
            .iter()
            .filter(|offer| !gone.contains(&offer.id))
            .cloned()
            .collect();
        if surviving.is_empty() {
            return Err(OfferError::IntegrityViolation(format!(
                "every offer for agent {} was rescinded",
                self.agent.agent_id
            )));
        }

        let pool = ResourceSet::combine_all(surviving.iter().map(|offer| &offer.resources));
        let remaining = self
            .accepted_tasks
            .iter()
            .try_fold(pool, |pool, matched| pool.subtract(&matched.request.total_demand()))?;

        debug!(
            agent = %self.agent.agent_id,
            dropped = gone.len(),
            remaining = %remaining,
            "dropped rescinded offers from holder"
        );
        self.offers = surviving;
        self.current_resources = remaining;
        Ok(())
    }

    /// Launch every accepted task against every offer in the holder.
    ///
    /// All offers are consumed together, even ones no task strictly needed.
    ///
    /// # Errors
    ///
    /// [`OfferError::IntegrityViolation`] if the holder is not building or has
    /// no accepted tasks; [`OfferError::CommitFailure`] when the driver does
    /// not report a running status. The holder is `Committed` either way once
    /// the call was issued.
    pub fn launch_tasks(&mut self, driver: &dyn LaunchCommitter) -> OfferResult<LaunchReport> {
        self.ensure_building("launch")?;
        if self.accepted_tasks.is_empty() {
            return Err(OfferError::IntegrityViolation(format!(
                "launch on agent {} without matched tasks",
                self.agent.agent_id
            )));
        }

        let offer_ids = self.offer_ids();
        let mut specs = Vec::with_capacity(self.accepted_tasks.len());
        for matched in &self.accepted_tasks {
            debug!(task = %matched.task_id, offer = %offer_ids[0], "launching task");
            specs.push(LaunchSpec {
                task_id: matched.task_id.clone(),
                pending_id: matched.request.pending_id.clone(),
                name: matched.request.name.clone(),
                agent_id: self.agent.agent_id.clone(),
                resources: matched.request.resources.clone(),
                executor: matched
                    .request
                    .executor
                    .as_ref()
                    .map(|executor| (executor.executor_id.clone(), executor.resources.clone())),
            });
            trace!(task = %matched.task_id, spec = ?specs.last(), "launch spec");
        }

        let status = driver.launch_tasks(&offer_ids, &specs);
        self.state = HolderState::Committed;

        let task_ids: Vec<String> = specs.iter().map(|spec| spec.task_id.clone()).collect();
        info!(
            count = task_ids.len(),
            tasks = ?task_ids,
            %status,
            "tasks launched"
        );

        if !status.is_running() {
            warn!(agent = %self.agent.agent_id, %status, "launch was not accepted");
            return Err(OfferError::CommitFailure {
                status,
                offers: offer_ids,
            });
        }

        Ok(LaunchReport {
            agent_id: self.agent.agent_id.clone(),
            offer_ids,
            task_ids,
            pending_ids: specs.into_iter().map(|spec| spec.pending_id).collect(),
            status,
        })
    }

    /// Give up the holder without launching; returns the offer ids to hand back.
    ///
    /// # Errors
    ///
    /// [`OfferError::IntegrityViolation`] if the holder is not building or
    /// already accepted tasks.
    pub fn release(&mut self) -> OfferResult<Vec<OfferId>> {
        self.ensure_building("release")?;
        if !self.accepted_tasks.is_empty() {
            return Err(OfferError::IntegrityViolation(format!(
                "release of agent {} would drop {} matched tasks",
                self.agent.agent_id,
                self.accepted_tasks.len()
            )));
        }
        self.state = HolderState::Released;
        Ok(self.offer_ids())
    }

    fn ensure_building(&self, action: &str) -> OfferResult<()> {
        if self.state == HolderState::Building {
            Ok(())
        } else {
            Err(OfferError::IntegrityViolation(format!(
                "cannot {action} on agent {}: holder is {:?}",
                self.agent.agent_id, self.state
            )))
        }
    }

    /// Identities of the held offers, in input order.
    #[must_use]
    pub fn offer_ids(&self) -> Vec<OfferId> {
        self.offers.iter().map(|offer| offer.id.clone()).collect()
    }

    /// Held offers.
    #[must_use]
    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    /// Accepted tasks in match order.
    #[must_use]
    pub fn accepted_tasks(&self) -> &[MatchedTask] {
        &self.accepted_tasks
    }

    /// Capacity not yet claimed by accepted tasks.
    #[must_use]
    pub const fn current_resources(&self) -> &ResourceSet {
        &self.current_resources
    }

    /// Roles shared by the held offers.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> HolderState {
        self.state
    }

    /// Agent identity.
    #[must_use]
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent.agent_id
    }

    /// Agent hostname.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.agent.hostname
    }

    /// Agent rack.
    #[must_use]
    pub fn rack_id(&self) -> &str {
        &self.agent.rack_id
    }

    /// Hostname with hyphens replaced by underscores.
    #[must_use]
    pub fn sanitized_host(&self) -> &str {
        &self.sanitized_host
    }

    /// Rack id with hyphens replaced by underscores.
    #[must_use]
    pub fn sanitized_rack_id(&self) -> &str {
        &self.sanitized_rack_id
    }

    /// Agent text attributes.
    #[must_use]
    pub const fn text_attributes(&self) -> &BTreeMap<String, String> {
        &self.agent.text_attributes
    }

    /// Attributes reserving this agent.
    #[must_use]
    pub const fn reserved_agent_attributes(&self) -> &BTreeMap<String, String> {
        &self.agent.reserved_attributes
    }

    /// True if the agent is reserved for specific workloads.
    #[must_use]
    pub fn has_reserved_agent_attributes(&self) -> bool {
        !self.agent.reserved_attributes.is_empty()
    }
}

impl fmt::Display for OfferHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offers: Vec<&str> = self.offers.iter().map(|offer| offer.id.as_str()).collect();
        write!(
            f,
            "OfferHolder{{agent={}, host={}, rack={}, offers=[{}], accepted={}, rejected={}, remaining={}, roles={:?}, state={:?}}}",
            self.agent.agent_id,
            self.agent.hostname,
            self.agent.rack_id,
            offers.join(","),
            self.accepted_tasks.len(),
            self.rejected_pending_task_ids.len(),
            self.current_resources,
            self.roles,
            self.state,
        )
    }
}
