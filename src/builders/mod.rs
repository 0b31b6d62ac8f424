//! Construction of caches and schedulers from configuration.

pub mod cache_builder;

pub use cache_builder::{build_offer_cache, build_scheduler};
