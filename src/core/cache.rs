//! The offer cache contract shared by the leased and null implementations.

use serde::{Deserialize, Serialize};

use crate::core::offer::{CachedOffer, Offer, OfferId};

/// What happened to an offer handed back with [`OfferCache::return_offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOutcome {
    /// The offer is available to the next checkout again.
    Returned,
    /// The offer was declined to the resource manager (stale, or caching is off).
    Declined,
    /// The cache no longer knew the offer; it was rescinded or already consumed.
    Gone,
}

/// Store of outstanding offers between scheduling passes.
///
/// Implementations are shared across scheduling workers and the ingress
/// channel, so every method takes `&self` and must be safe to call
/// concurrently. Unknown offer ids are never an error: rescission racing a
/// pass is the steady state.
pub trait OfferCache: Send + Sync {
    /// Record a new offer as available, or decline it when caching is off.
    fn cache_offer(&self, timestamp_ms: u128, offer: Offer);

    /// Forget an offer in any state. Returns `false` if it was unknown.
    fn rescind_offer(&self, offer_id: &OfferId) -> bool;

    /// Mark a checked-out offer as consumed. Returns `false` if it was already gone.
    fn use_offer(&self, cached: &CachedOffer) -> bool;

    /// Atomically claim every available offer for the calling pass.
    fn checkout_offers(&self) -> Vec<CachedOffer>;

    /// Hand back an offer the pass did not use.
    fn return_offer(&self, cached: CachedOffer) -> ReturnOutcome;

    /// Snapshot of the available offers, without claiming them.
    fn peek_offers(&self) -> Vec<Offer>;

    /// Stop caching: new offers are declined and queries read as empty.
    fn disable_offer_cache(&self);

    /// Resume caching.
    fn enable_offer_cache(&self);

    /// True while offers are being cached.
    fn is_enabled(&self) -> bool;
}
