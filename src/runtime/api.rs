//! Serializable diagnostic views of the offer cache.

use serde::{Deserialize, Serialize};

use crate::core::cache::OfferCache;
use crate::core::offer::Offer;

/// One available offer, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferView {
    /// Offer identity.
    pub offer_id: String,
    /// Agent identity.
    pub agent_id: String,
    /// Agent hostname.
    pub hostname: String,
    /// Resources rendered as `{name:amount, ...}`.
    pub resources: String,
    /// Roles the resources belong to.
    pub roles: Vec<String>,
}

impl From<&Offer> for OfferView {
    fn from(offer: &Offer) -> Self {
        Self {
            offer_id: offer.id.to_string(),
            agent_id: offer.agent_id.to_string(),
            hostname: offer.hostname.clone(),
            resources: offer.resources.to_string(),
            roles: offer.roles.iter().cloned().collect(),
        }
    }
}

/// Cache diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Whether offers are being cached.
    pub enabled: bool,
    /// Available offers in arrival order.
    pub offers: Vec<OfferView>,
}

/// Snapshot of the available offers. Does not affect checkout.
pub fn cache_snapshot(cache: &dyn OfferCache) -> CacheSnapshot {
    CacheSnapshot {
        enabled: cache.is_enabled(),
        offers: cache.peek_offers().iter().map(OfferView::from).collect(),
    }
}
