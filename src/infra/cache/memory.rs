//! In-memory lease registry of outstanding offers.
//!
//! Every offer lives in one map guarded by a single `parking_lot::Mutex`.
//! Checkout scans and marks under that lock, so concurrent passes never see
//! the same offer. Each checkout issues a fresh lease number; `return_offer`
//! and `use_offer` only act while the caller's lease is the one on record,
//! which turns a rescission racing a pass into a plain `Gone` outcome.
//!
//! Declines are collected under the lock and sent to the driver after it is
//! released.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::OfferCacheConfig;
use crate::core::audit::{build_offer_event, AuditSink, OfferAction};
use crate::core::cache::{OfferCache, ReturnOutcome};
use crate::core::driver::LaunchCommitter;
use crate::core::offer::{CachedOffer, Offer, OfferId, OfferState};
use crate::util::clock::{Clock, SystemClock};

struct Entry {
    offer: Offer,
    cached_at_ms: u128,
    seq: u64,
    state: OfferState,
    lease: u64,
}

struct Registry {
    entries: HashMap<OfferId, Entry>,
    enabled: bool,
    next_seq: u64,
    next_lease: u64,
}

/// Offer cache with exclusive checkout leases and age-based declines.
pub struct LeasedOfferCache {
    config: OfferCacheConfig,
    registry: Mutex<Registry>,
    driver: Arc<dyn LaunchCommitter>,
    clock: Arc<dyn Clock>,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
}

impl LeasedOfferCache {
    /// Create a cache that declines through `driver`, using the system clock.
    pub fn new(config: OfferCacheConfig, driver: Arc<dyn LaunchCommitter>) -> Self {
        Self::with_clock(config, driver, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock.
    pub fn with_clock(
        config: OfferCacheConfig,
        driver: Arc<dyn LaunchCommitter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let enabled = config.enabled;
        Self {
            config,
            registry: Mutex::new(Registry {
                entries: HashMap::new(),
                enabled,
                next_seq: 0,
                next_lease: 1,
            }),
            driver,
            clock,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Mutex::new(audit));
        self
    }

    /// Number of offers currently tracked, available or checked out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// True if no offers are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of offers currently checked out by passes.
    #[must_use]
    pub fn checked_out_count(&self) -> usize {
        self.registry
            .lock()
            .entries
            .values()
            .filter(|entry| entry.state == OfferState::CheckedOut)
            .count()
    }

    fn is_stale(&self, cached_at_ms: u128, now_ms: u128) -> bool {
        now_ms.saturating_sub(cached_at_ms) > u128::from(self.config.max_offer_age_ms)
    }

    fn decline(&self, offer_id: &OfferId, reason: &str) {
        let status = self.driver.decline_offer(offer_id);
        if !status.is_running() {
            warn!(offer = %offer_id, %status, "decline was not accepted");
        }
        debug!(offer = %offer_id, reason, "declined offer");
        self.record(offer_id, OfferAction::Declined, None, Some(reason.to_string()));
    }

    fn record(
        &self,
        offer_id: &OfferId,
        action: OfferAction,
        state: Option<OfferState>,
        detail: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit
                .lock()
                .record(build_offer_event(offer_id.clone(), action, state, detail));
        }
    }
}

impl OfferCache for LeasedOfferCache {
    fn cache_offer(&self, timestamp_ms: u128, offer: Offer) {
        let offer_id = offer.id.clone();
        {
            let mut registry = self.registry.lock();
            if registry.enabled {
                if registry.entries.contains_key(&offer_id) {
                    warn!(offer = %offer_id, "ignoring duplicate offer");
                    return;
                }
                let seq = registry.next_seq;
                registry.next_seq += 1;
                registry.entries.insert(
                    offer_id.clone(),
                    Entry {
                        offer,
                        cached_at_ms: timestamp_ms,
                        seq,
                        state: OfferState::Available,
                        lease: 0,
                    },
                );
                drop(registry);
                debug!(offer = %offer_id, "cached offer");
                self.record(&offer_id, OfferAction::Cached, Some(OfferState::Available), None);
                return;
            }
        }
        self.decline(&offer_id, "offer cache disabled");
    }

    fn rescind_offer(&self, offer_id: &OfferId) -> bool {
        let removed = self.registry.lock().entries.remove(offer_id);
        match removed {
            Some(entry) => {
                debug!(offer = %offer_id, was = ?entry.state, "rescinded offer");
                self.record(
                    offer_id,
                    OfferAction::Rescinded,
                    Some(OfferState::Rescinded),
                    Some(format!("was {:?}", entry.state)),
                );
                true
            }
            None => {
                debug!(offer = %offer_id, "rescind for unknown offer");
                false
            }
        }
    }

    fn use_offer(&self, cached: &CachedOffer) -> bool {
        let consumed = {
            let mut registry = self.registry.lock();
            let held = registry.entries.get(cached.id()).is_some_and(|entry| {
                entry.state == OfferState::CheckedOut && entry.lease == cached.lease()
            });
            if held {
                registry.entries.remove(cached.id());
            }
            held
        };
        if consumed {
            self.record(cached.id(), OfferAction::Consumed, None, None);
        } else {
            debug!(offer = %cached.id(), "offer already gone when used");
        }
        consumed
    }

    fn checkout_offers(&self) -> Vec<CachedOffer> {
        let now = self.clock.now_ms();
        let mut stale = Vec::new();
        let mut claimed = Vec::new();
        {
            let mut registry = self.registry.lock();
            if !registry.enabled {
                return Vec::new();
            }

            let mut available: Vec<(u64, OfferId)> = Vec::new();
            for (id, entry) in &registry.entries {
                if entry.state != OfferState::Available {
                    continue;
                }
                if self.is_stale(entry.cached_at_ms, now) {
                    stale.push(id.clone());
                } else {
                    available.push((entry.seq, id.clone()));
                }
            }
            for id in &stale {
                registry.entries.remove(id);
            }
            available.sort_unstable();

            for (_, id) in available {
                let lease = registry.next_lease;
                registry.next_lease += 1;
                if let Some(entry) = registry.entries.get_mut(&id) {
                    entry.state = OfferState::CheckedOut;
                    entry.lease = lease;
                    claimed.push(CachedOffer::new(entry.offer.clone(), entry.cached_at_ms, lease));
                }
            }
        }

        for id in &stale {
            self.decline(id, "offer expired before checkout");
        }
        for cached in &claimed {
            self.record(cached.id(), OfferAction::CheckedOut, Some(OfferState::CheckedOut), None);
        }
        debug!(count = claimed.len(), expired = stale.len(), "checked out offers");
        claimed
    }

    fn return_offer(&self, cached: CachedOffer) -> ReturnOutcome {
        let now = self.clock.now_ms();
        let outcome = {
            let mut registry = self.registry.lock();
            let enabled = registry.enabled;
            let outcome = match registry.entries.get(cached.id()) {
                // lease 0 is never issued: the offer came straight from the
                // manager while caching was off
                None if !enabled && cached.lease() == 0 => ReturnOutcome::Declined,
                None => ReturnOutcome::Gone,
                Some(entry)
                    if entry.state != OfferState::CheckedOut || entry.lease != cached.lease() =>
                {
                    ReturnOutcome::Gone
                }
                Some(entry) if enabled && !self.is_stale(entry.cached_at_ms, now) => {
                    ReturnOutcome::Returned
                }
                Some(_) => ReturnOutcome::Declined,
            };
            match outcome {
                ReturnOutcome::Returned => {
                    if let Some(entry) = registry.entries.get_mut(cached.id()) {
                        entry.state = OfferState::Available;
                        entry.lease = 0;
                    }
                }
                ReturnOutcome::Declined => {
                    registry.entries.remove(cached.id());
                }
                ReturnOutcome::Gone => {}
            }
            outcome
        };

        match outcome {
            ReturnOutcome::Returned => {
                debug!(offer = %cached.id(), "returned offer");
                self.record(cached.id(), OfferAction::Returned, Some(OfferState::Available), None);
            }
            ReturnOutcome::Declined => {
                self.decline(cached.id(), "offer stale or cache disabled on return");
            }
            ReturnOutcome::Gone => {
                debug!(offer = %cached.id(), "returned offer was already gone");
            }
        }
        outcome
    }

    fn peek_offers(&self) -> Vec<Offer> {
        let registry = self.registry.lock();
        if !registry.enabled {
            return Vec::new();
        }
        let mut available: Vec<&Entry> = registry
            .entries
            .values()
            .filter(|entry| entry.state == OfferState::Available)
            .collect();
        available.sort_unstable_by_key(|entry| entry.seq);
        available.into_iter().map(|entry| entry.offer.clone()).collect()
    }

    fn disable_offer_cache(&self) {
        let flushed: Vec<OfferId> = {
            let mut registry = self.registry.lock();
            if !registry.enabled {
                return;
            }
            registry.enabled = false;
            if self.config.flush_on_disable {
                let ids: Vec<OfferId> = registry
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.state == OfferState::Available)
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in &ids {
                    registry.entries.remove(id);
                }
                ids
            } else {
                Vec::new()
            }
        };
        info!(flushed = flushed.len(), "offer cache disabled");
        for id in &flushed {
            self.decline(id, "offer cache disabled");
        }
    }

    fn enable_offer_cache(&self) {
        let mut registry = self.registry.lock();
        if !registry.enabled {
            registry.enabled = true;
            drop(registry);
            info!("offer cache enabled");
        }
    }

    fn is_enabled(&self) -> bool {
        self.registry.lock().enabled
    }
}
