//! One scheduling pass: checkout, per-agent matching, and commit.
//!
//! A pass claims every available offer, folds the offers of each agent into
//! an [`OfferHolder`], and walks the pending work in priority order, placing
//! each unit on the first holder it fits (greedy first-fit). Holders with
//! matches are committed on a small pool of scoped threads fed through a
//! `crossbeam-channel`; holders without matches hand their offers back.
//!
//! While the cache is disabled, offers handed to [`OfferScheduler::resource_offers`]
//! are matched directly and whatever is left over is declined.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::SchedulerConfig;
use crate::core::cache::{OfferCache, ReturnOutcome};
use crate::core::driver::LaunchCommitter;
use crate::core::error::OfferError;
use crate::core::holder::{AgentDescriptor, LaunchReport, OfferHolder};
use crate::core::matching::{sufficient_for, PendingTaskId, TaskRequest};
use crate::core::offer::{AgentId, CachedOffer, Offer, OfferId};
use crate::util::clock::{Clock, SystemClock};

/// Tally of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassSummary {
    /// Offers the pass worked with.
    pub offers: usize,
    /// Successful launches, one per agent, in agent arrival order.
    pub launched: Vec<LaunchReport>,
    /// Work units whose launch the driver did not accept.
    pub failed: Vec<PendingTaskId>,
    /// Work units no agent could take.
    pub unmatched: Vec<PendingTaskId>,
    /// Work units dropped because their offers were rescinded before commit.
    pub abandoned: Vec<PendingTaskId>,
    /// Offers handed back to the cache.
    pub returned: usize,
    /// Offers declined to the resource manager.
    pub declined: usize,
    /// Offers that were already gone when the pass tried to give them back or use them.
    pub gone: usize,
}

impl PassSummary {
    /// Number of tasks launched across all agents.
    #[must_use]
    pub fn launched_tasks(&self) -> usize {
        self.launched.iter().map(|report| report.task_ids.len()).sum()
    }
}

struct Binding {
    index: usize,
    holder: OfferHolder,
    claimed: Vec<CachedOffer>,
    passthrough: bool,
}

#[derive(Default)]
struct CommitOutcome {
    index: usize,
    report: Option<LaunchReport>,
    failed: Vec<PendingTaskId>,
    abandoned: Vec<PendingTaskId>,
    declined: usize,
    gone: usize,
}

/// Drives scheduling passes against a shared offer cache.
pub struct OfferScheduler {
    cache: Arc<dyn OfferCache>,
    driver: Arc<dyn LaunchCommitter>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl OfferScheduler {
    /// Create a scheduler over `cache`, launching through `driver`.
    pub fn new(
        cache: Arc<dyn OfferCache>,
        driver: Arc<dyn LaunchCommitter>,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_clock(cache, driver, config, Arc::new(SystemClock))
    }

    /// Create a scheduler stamping incoming offers with `clock`.
    pub fn with_clock(
        cache: Arc<dyn OfferCache>,
        driver: Arc<dyn LaunchCommitter>,
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            driver,
            clock,
            config,
        }
    }

    /// The cache this scheduler draws from.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn OfferCache> {
        &self.cache
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Accept a batch of fresh offers and run a pass.
    ///
    /// With caching on, the offers are cached first and the pass sees them
    /// together with everything else available. With caching off, only the
    /// batch is matched and unused offers are declined.
    pub fn resource_offers(&self, offers: Vec<Offer>, pending: &[TaskRequest]) -> PassSummary {
        let now = self.clock.now_ms();
        if self.cache.is_enabled() {
            for offer in offers {
                self.cache.cache_offer(now, offer);
            }
            return self.run_pass(pending);
        }

        debug!(count = offers.len(), "caching is off, matching offers directly");
        let claimed = offers
            .into_iter()
            .map(|offer| CachedOffer::new(offer, now, 0))
            .collect();
        self.schedule(claimed, pending, true)
    }

    /// Check out every available offer and place `pending` (highest priority
    /// first) against it.
    pub fn run_pass(&self, pending: &[TaskRequest]) -> PassSummary {
        let claimed = self.cache.checkout_offers();
        self.schedule(claimed, pending, false)
    }

    fn schedule(
        &self,
        claimed: Vec<CachedOffer>,
        pending: &[TaskRequest],
        passthrough: bool,
    ) -> PassSummary {
        let mut summary = PassSummary {
            offers: claimed.len(),
            ..PassSummary::default()
        };
        if claimed.is_empty() {
            summary.unmatched = pending.iter().map(|task| task.pending_id.clone()).collect();
            debug!(pending = pending.len(), "no offers for this pass");
            return summary;
        }

        let mut bindings = Vec::new();
        for claimed in group_by_agent(claimed) {
            match self.bind(bindings.len(), claimed, passthrough) {
                Ok(binding) => bindings.push(binding),
                Err((err, claimed)) => {
                    warn!(error = %err, "could not build holder, handing offers back");
                    for cached in claimed {
                        self.dispose(cached, passthrough, &mut summary);
                    }
                }
            }
        }

        summary.unmatched = place(&mut bindings, pending);

        let (busy, idle): (Vec<Binding>, Vec<Binding>) = bindings
            .into_iter()
            .partition(|binding| !binding.holder.accepted_tasks().is_empty());

        for mut binding in idle {
            if let Err(err) = binding.holder.release() {
                warn!(error = %err, "holder release failed");
            }
            for cached in binding.claimed {
                self.dispose(cached, binding.passthrough, &mut summary);
            }
        }

        let mut outcomes = self.commit_all(busy);
        outcomes.sort_unstable_by_key(|outcome| outcome.index);
        for outcome in outcomes {
            summary.launched.extend(outcome.report);
            summary.failed.extend(outcome.failed);
            summary.abandoned.extend(outcome.abandoned);
            summary.declined += outcome.declined;
            summary.gone += outcome.gone;
        }

        info!(
            offers = summary.offers,
            launched = summary.launched_tasks(),
            failed = summary.failed.len(),
            unmatched = summary.unmatched.len(),
            abandoned = summary.abandoned.len(),
            returned = summary.returned,
            declined = summary.declined,
            gone = summary.gone,
            "scheduling pass finished"
        );
        summary
    }

    fn bind(
        &self,
        index: usize,
        claimed: Vec<CachedOffer>,
        passthrough: bool,
    ) -> Result<Binding, (OfferError, Vec<CachedOffer>)> {
        let Some(first) = claimed.first() else {
            return Err((
                OfferError::IntegrityViolation("empty agent group".into()),
                claimed,
            ));
        };
        let agent = AgentDescriptor::from_offer(
            first.offer(),
            &self.config.rack_attribute_key,
            &self.config.default_rack_id,
            &self.config.reserved_agent_attributes,
        );
        let offers = claimed.iter().map(|cached| cached.offer().clone()).collect();
        match OfferHolder::new(offers, self.config.task_size_hint, agent) {
            Ok(holder) => {
                trace!(holder = %holder, "holder built");
                Ok(Binding {
                    index,
                    holder,
                    claimed,
                    passthrough,
                })
            }
            Err(err) => Err((err, claimed)),
        }
    }

    fn dispose(&self, cached: CachedOffer, passthrough: bool, summary: &mut PassSummary) {
        if passthrough {
            self.driver.decline_offer(cached.id());
            summary.declined += 1;
            return;
        }
        match self.cache.return_offer(cached) {
            ReturnOutcome::Returned => summary.returned += 1,
            ReturnOutcome::Declined => summary.declined += 1,
            ReturnOutcome::Gone => summary.gone += 1,
        }
    }

    fn commit_all(&self, busy: Vec<Binding>) -> Vec<CommitOutcome> {
        let workers = self.config.commit_workers.clamp(1, busy.len().max(1));
        if workers == 1 {
            return busy.into_iter().map(|binding| self.commit(binding)).collect();
        }

        let (job_tx, job_rx) = unbounded::<Binding>();
        let (out_tx, out_rx) = unbounded::<CommitOutcome>();
        // job_rx is held until every worker has drained the queue
        for binding in busy {
            job_tx.send(binding).expect("commit queue receiver dropped");
        }
        drop(job_tx);

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let job_rx = job_rx.clone();
                let out_tx = out_tx.clone();
                scope.spawn(move || {
                    for binding in job_rx.iter() {
                        if out_tx.send(self.commit(binding)).is_err() {
                            break;
                        }
                    }
                    trace!(worker_id, "commit worker drained");
                });
            }
        });
        drop(out_tx);
        out_rx.try_iter().collect()
    }

    fn commit(&self, binding: Binding) -> CommitOutcome {
        let Binding {
            index,
            mut holder,
            claimed,
            passthrough,
        } = binding;
        let mut outcome = CommitOutcome {
            index,
            ..CommitOutcome::default()
        };

        let mut gone = HashSet::new();
        if !passthrough {
            for cached in &claimed {
                if !self.cache.use_offer(cached) {
                    gone.insert(cached.id().clone());
                }
            }
        }
        outcome.gone = gone.len();

        if let Err(err) = holder.drop_offers(&gone) {
            warn!(
                agent = %holder.agent_id(),
                error = %err,
                "offers rescinded under the pass, abandoning matched tasks"
            );
            outcome.abandoned = pending_ids(&holder);
            let survivors: Vec<OfferId> = claimed
                .iter()
                .map(|cached| cached.id().clone())
                .filter(|id| !gone.contains(id))
                .collect();
            for offer_id in survivors {
                self.driver.decline_offer(&offer_id);
                outcome.declined += 1;
            }
            return outcome;
        }

        match holder.launch_tasks(self.driver.as_ref()) {
            Ok(report) => outcome.report = Some(report),
            Err(OfferError::CommitFailure { status, offers }) => {
                debug!(%status, offers = offers.len(), "launch rejected");
                outcome.failed = pending_ids(&holder);
            }
            Err(err) => {
                warn!(agent = %holder.agent_id(), error = %err, "launch skipped");
                outcome.abandoned = pending_ids(&holder);
            }
        }
        outcome
    }
}

fn pending_ids(holder: &OfferHolder) -> Vec<PendingTaskId> {
    holder
        .accepted_tasks()
        .iter()
        .map(|matched| matched.request.pending_id.clone())
        .collect()
}

/// Group offers by agent, keeping agents and offers in arrival order.
fn group_by_agent(claimed: Vec<CachedOffer>) -> Vec<Vec<CachedOffer>> {
    let mut slots: HashMap<AgentId, usize> = HashMap::new();
    let mut groups: Vec<Vec<CachedOffer>> = Vec::new();
    for cached in claimed {
        let agent = cached.offer().agent_id.clone();
        let slot = *slots.entry(agent).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(cached);
    }
    groups
}

/// Greedy first-fit. Returns the work units no holder accepted.
fn place(bindings: &mut [Binding], pending: &[TaskRequest]) -> Vec<PendingTaskId> {
    let mut unmatched = Vec::new();
    for task in pending {
        let mut placed = false;
        for binding in bindings.iter_mut() {
            let holder = &mut binding.holder;
            if holder.has_rejected_pending_task_already(&task.pending_id) {
                continue;
            }
            if !sufficient_for(&holder.profile(), task) {
                holder.add_rejected_task(task.pending_id.clone());
                continue;
            }
            match holder.add_matched_task(task.clone()) {
                Ok(matched) => {
                    trace!(task = %matched.task_id, "matched");
                    placed = true;
                    break;
                }
                Err(err) => {
                    debug!(pending = %task.pending_id, error = %err, "match refused");
                    holder.add_rejected_task(task.pending_id.clone());
                }
            }
        }
        if !placed {
            unmatched.push(task.pending_id.clone());
        }
    }
    unmatched
}
