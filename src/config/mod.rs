//! Configuration models for the offer cache and scheduling passes.

pub mod offer;

pub use offer::{OfferCacheConfig, SchedulerConfig};
