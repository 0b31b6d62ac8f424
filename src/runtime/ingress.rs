//! Resource-manager ingress on a dedicated OS thread.
//!
//! Offer grants and rescission notices arrive on their own channel,
//! independent of scheduling passes. [`OfferIngress`] owns a thread that
//! drains a bounded `crossbeam-channel` and applies each event to the cache.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::cache::OfferCache;
use crate::core::error::{OfferError, OfferResult};
use crate::core::offer::{Offer, OfferId};

/// Event delivered by the resource manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ManagerEvent {
    /// A batch of new offers, stamped with the time it was received.
    Offers {
        /// Arrival time (ms since epoch).
        received_at_ms: u128,
        /// Offers granted.
        offers: Vec<Offer>,
    },
    /// An offer was withdrawn.
    Rescind(OfferId),
}

/// Counters kept by an ingress loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressStats {
    /// Offers handed to the cache.
    pub offers: u64,
    /// Rescissions that removed an offer.
    pub rescinded: u64,
    /// Rescissions for offers the cache no longer knew.
    pub unknown_rescinds: u64,
}

/// Apply one event to `cache`, updating `stats`.
pub fn apply_event(cache: &dyn OfferCache, event: ManagerEvent, stats: &mut IngressStats) {
    match event {
        ManagerEvent::Offers {
            received_at_ms,
            offers,
        } => {
            debug!(count = offers.len(), "offers received");
            for offer in offers {
                cache.cache_offer(received_at_ms, offer);
                stats.offers += 1;
            }
        }
        ManagerEvent::Rescind(offer_id) => {
            if cache.rescind_offer(&offer_id) {
                stats.rescinded += 1;
            } else {
                debug!(offer = %offer_id, "rescind for unknown offer");
                stats.unknown_rescinds += 1;
            }
        }
    }
}

/// Handle to a running ingress thread.
pub struct OfferIngress {
    sender: Option<Sender<ManagerEvent>>,
    handle: Option<JoinHandle<IngressStats>>,
}

impl OfferIngress {
    /// Start an ingress thread feeding `cache`, buffering up to `capacity` events.
    ///
    /// # Errors
    ///
    /// [`OfferError::Ingress`] if `capacity` is zero or the thread cannot be spawned.
    pub fn spawn(cache: Arc<dyn OfferCache>, capacity: usize) -> OfferResult<Self> {
        if capacity == 0 {
            return Err(OfferError::Ingress("capacity must be greater than 0".into()));
        }
        let (sender, receiver) = bounded::<ManagerEvent>(capacity);
        let handle = thread::Builder::new()
            .name("offer-ingress".into())
            .spawn(move || {
                debug!("ingress thread started");
                let mut stats = IngressStats::default();
                for event in &receiver {
                    apply_event(cache.as_ref(), event, &mut stats);
                }
                info!(
                    offers = stats.offers,
                    rescinded = stats.rescinded,
                    unknown_rescinds = stats.unknown_rescinds,
                    "ingress channel closed"
                );
                stats
            })
            .map_err(|e| OfferError::Ingress(format!("failed to spawn ingress thread: {e}")))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// A sender for producers on other threads.
    ///
    /// # Errors
    ///
    /// [`OfferError::Ingress`] after shutdown has begun.
    pub fn sender(&self) -> OfferResult<Sender<ManagerEvent>> {
        self.sender
            .clone()
            .ok_or_else(|| OfferError::Ingress("ingress is shut down".into()))
    }

    /// Queue an event, blocking while the buffer is full.
    ///
    /// # Errors
    ///
    /// [`OfferError::Ingress`] if the ingress thread is gone.
    pub fn send(&self, event: ManagerEvent) -> OfferResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| OfferError::Ingress("ingress is shut down".into()))?;
        sender
            .send(event)
            .map_err(|_| OfferError::Ingress("ingress thread has exited".into()))
    }

    /// Queue an event without blocking.
    ///
    /// # Errors
    ///
    /// [`OfferError::Ingress`] if the buffer is full or the thread is gone.
    pub fn try_send(&self, event: ManagerEvent) -> OfferResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| OfferError::Ingress("ingress is shut down".into()))?;
        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("ingress buffer is full");
                Err(OfferError::Ingress("ingress buffer is full".into()))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(OfferError::Ingress("ingress thread has exited".into()))
            }
        }
    }

    /// Close the channel and wait for the thread to drain it.
    ///
    /// Senders obtained from [`OfferIngress::sender`] must be dropped first,
    /// or this waits for them.
    ///
    /// # Errors
    ///
    /// [`OfferError::Ingress`] if the thread panicked.
    pub fn shutdown(mut self) -> OfferResult<IngressStats> {
        self.sender.take();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| OfferError::Ingress("ingress thread panicked".into())),
            None => Ok(IngressStats::default()),
        }
    }
}

impl Drop for OfferIngress {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!("OfferIngress dropped without shutdown - thread will be detached");
        }
    }
}
