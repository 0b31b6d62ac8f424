//! Offer lifecycle audit trail.
//!
//! Every state change the leased cache makes can be recorded to an
//! [`AuditSink`]; the in-memory sink keeps a bounded window for diagnostics
//! and tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::offer::{OfferId, OfferState};
use crate::util::clock::now_ms;

/// Lifecycle step recorded for an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferAction {
    /// Stored as available.
    Cached,
    /// Claimed by a checkout.
    CheckedOut,
    /// Handed back and available again.
    Returned,
    /// Consumed by a launch.
    Consumed,
    /// Withdrawn by the resource manager.
    Rescinded,
    /// Declined back to the resource manager.
    Declined,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferEvent {
    /// Event identifier.
    pub event_id: String,
    /// Offer the event is about.
    pub offer_id: OfferId,
    /// Step taken.
    pub action: OfferAction,
    /// State the offer was left in, `None` once it left the cache.
    pub state: Option<OfferState>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: OfferEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<OfferEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<OfferEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: OfferEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn record(&mut self, event: OfferEvent) {
        self.lock().record(event);
    }
}

/// Helper to build an audit event stamped with a fresh id and the current time.
#[must_use]
pub fn build_offer_event(
    offer_id: OfferId,
    action: OfferAction,
    state: Option<OfferState>,
    detail: Option<String>,
) -> OfferEvent {
    OfferEvent {
        event_id: Uuid::new_v4().to_string(),
        offer_id,
        action,
        state,
        created_at_ms: now_ms(),
        detail,
    }
}
