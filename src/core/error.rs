//! Error types for offer bookkeeping and matching.

use thiserror::Error;

use crate::core::driver::DriverStatus;
use crate::core::offer::OfferId;

/// Errors produced by the offer engine.
#[derive(Debug, Error)]
pub enum OfferError {
    /// The cache no longer holds this offer (consumed, expired, or rescinded).
    #[error("unknown offer: {0}")]
    UnknownOffer(OfferId),
    /// A subtraction would drive a resource dimension below zero.
    #[error("insufficient {resource}: requested {requested}, available {available}")]
    InsufficientResources {
        /// Resource name.
        resource: String,
        /// Amount (or range description) requested.
        requested: String,
        /// Amount (or range description) available.
        available: String,
    },
    /// The resource manager did not accept a launch.
    #[error("launch against {offers:?} failed with status {status}")]
    CommitFailure {
        /// Status reported by the driver.
        status: DriverStatus,
        /// Offers the launch was issued against.
        offers: Vec<OfferId>,
    },
    /// A caller broke a construction or usage contract.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The ingress channel was closed or a worker could not be started.
    #[error("ingress error: {0}")]
    Ingress(String),
}

/// Result alias for offer engine operations.
pub type OfferResult<T> = Result<T, OfferError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
