//! Offer cache that never retains anything.
//!
//! Used when caching is turned off in configuration: incoming offers are
//! declined on arrival, queries are empty, and anything handed back is
//! declined as well.

use std::sync::Arc;

use tracing::debug;

use crate::core::cache::{OfferCache, ReturnOutcome};
use crate::core::driver::LaunchCommitter;
use crate::core::offer::{CachedOffer, Offer, OfferId};

/// Cache variant that declines every offer instead of storing it.
pub struct NullOfferCache {
    driver: Arc<dyn LaunchCommitter>,
}

impl NullOfferCache {
    /// Create a null cache declining through `driver`.
    pub fn new(driver: Arc<dyn LaunchCommitter>) -> Self {
        Self { driver }
    }
}

impl OfferCache for NullOfferCache {
    fn cache_offer(&self, _timestamp_ms: u128, offer: Offer) {
        debug!(offer = %offer.id, "declining offer, caching is off");
        self.driver.decline_offer(&offer.id);
    }

    fn rescind_offer(&self, _offer_id: &OfferId) -> bool {
        false
    }

    fn use_offer(&self, _cached: &CachedOffer) -> bool {
        false
    }

    fn checkout_offers(&self) -> Vec<CachedOffer> {
        Vec::new()
    }

    fn return_offer(&self, cached: CachedOffer) -> ReturnOutcome {
        self.driver.decline_offer(cached.id());
        ReturnOutcome::Declined
    }

    fn peek_offers(&self) -> Vec<Offer> {
        Vec::new()
    }

    fn disable_offer_cache(&self) {}

    fn enable_offer_cache(&self) {}

    fn is_enabled(&self) -> bool {
        false
    }
}
