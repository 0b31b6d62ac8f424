//! Offer bookkeeping, matching, and the scheduling pass.

pub mod audit;
pub mod cache;
pub mod driver;
pub mod error;
pub mod holder;
pub mod matching;
pub mod offer;
pub mod resources;
pub mod scheduler;

pub use audit::{build_offer_event, AuditSink, InMemoryAuditSink, OfferAction, OfferEvent};
pub use cache::{OfferCache, ReturnOutcome};
pub use driver::{DriverStatus, LaunchCommitter, LaunchSpec};
pub use error::{AppResult, OfferError, OfferResult};
pub use holder::{AgentDescriptor, HolderState, LaunchReport, MatchedTask, OfferHolder};
pub use matching::{
    check_fit, sufficient_for, AgentProfile, ExecutorSpec, Fit, PendingTaskId, TaskRequest,
    UNRESERVED_ROLE,
};
pub use offer::{AgentId, CachedOffer, Offer, OfferId, OfferState};
pub use resources::{ResourceSet, ValueRange, CPUS, DISK, MEMORY, PORTS};
pub use scheduler::{OfferScheduler, PassSummary};
