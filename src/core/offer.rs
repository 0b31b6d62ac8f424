//! Offers granted by the resource manager and their cached form.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::resources::ResourceSet;

/// Opaque offer identity assigned by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

/// Opaque agent identity assigned by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl OfferId {
    /// Create an offer id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AgentId {
    /// Create an agent id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A time-bounded grant of spare capacity on one agent.
///
/// Immutable once received; the engine only tracks bookkeeping around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Offer identity.
    pub id: OfferId,
    /// Agent the capacity lives on.
    pub agent_id: AgentId,
    /// Agent hostname.
    pub hostname: String,
    /// Offered resources.
    pub resources: ResourceSet,
    /// Roles the resources are allocated to.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Agent attributes advertised with the offer.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Offer {
    /// Create an offer with no roles or attributes.
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        hostname: impl Into<String>,
        resources: ResourceSet,
    ) -> Self {
        Self {
            id: OfferId::new(id),
            agent_id: AgentId::new(agent_id),
            hostname: hostname.into(),
            resources,
            roles: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle state of an offer inside the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferState {
    /// Visible to the next checkout.
    Available,
    /// Claimed by exactly one scheduling pass.
    CheckedOut,
    /// Withdrawn by the resource manager.
    Rescinded,
}

/// An offer handed out by a cache checkout.
///
/// Carries the lease number the cache issued with it; returning or using the
/// offer only succeeds while that lease is still the one on record.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedOffer {
    offer: Offer,
    cached_at_ms: u128,
    lease: u64,
}

impl CachedOffer {
    /// Wrap an offer with its arrival timestamp and lease number.
    #[must_use]
    pub const fn new(offer: Offer, cached_at_ms: u128, lease: u64) -> Self {
        Self {
            offer,
            cached_at_ms,
            lease,
        }
    }

    /// The wrapped offer.
    #[must_use]
    pub const fn offer(&self) -> &Offer {
        &self.offer
    }

    /// Offer identity.
    #[must_use]
    pub const fn id(&self) -> &OfferId {
        &self.offer.id
    }

    /// Arrival timestamp (ms since epoch).
    #[must_use]
    pub const fn cached_at_ms(&self) -> u128 {
        self.cached_at_ms
    }

    /// Lease number issued at checkout.
    #[must_use]
    pub const fn lease(&self) -> u64 {
        self.lease
    }

    /// Age relative to `now_ms`.
    #[must_use]
    pub const fn age_ms(&self, now_ms: u128) -> u128 {
        now_ms.saturating_sub(self.cached_at_ms)
    }

    /// Unwrap into the inner offer.
    #[must_use]
    pub fn into_offer(self) -> Offer {
        self.offer
    }
}
