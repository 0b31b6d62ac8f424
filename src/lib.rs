//! # Prometheus Offer Engine
//!
//! Offer lifecycle and matching engine for schedulers running on an
//! offer-based cluster resource manager.
//!
//! The resource manager periodically grants the scheduler time-bounded
//! offers of spare agent capacity. This crate holds those offers between
//! scheduling passes, hands each one to at most one pass at a time, folds
//! the offers of each agent into a single pool, greedily places pending work
//! against it, and commits one atomic launch per agent.
//!
//! ## Core Problem Solved
//!
//! Three sources of truth change concurrently:
//!
//! - **Offers arrive** from the resource manager at any time
//! - **Scheduling passes** claim and consume offers on worker threads
//! - **Rescissions and expiry** invalidate offers a pass may already hold
//!
//! The engine guarantees no capacity is handed to two passes and no claimed
//! offer is silently dropped: every offer ends launched, returned, declined,
//! or rescinded.
//!
//! ## Key Features
//!
//! - **Leased checkout**: `LeasedOfferCache` issues a lease per checkout; stale
//!   leases cannot return or consume an offer
//! - **Null variant**: `NullOfferCache` declines every offer, selected from config
//! - **Per-agent holders**: `OfferHolder` combines offers, tracks remaining
//!   resources, and remembers rejected work for the pass
//! - **Scheduling pass**: `OfferScheduler` runs checkout, first-fit placement,
//!   and parallel commits
//! - **Ingress loops**: a dedicated thread or a tokio task applying offer and
//!   rescind events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_offer_engine::builders::build_scheduler;
//! use prometheus_offer_engine::config::SchedulerConfig;
//! use prometheus_offer_engine::core::{Offer, ResourceSet, TaskRequest};
//! use prometheus_offer_engine::infra::RecordingDriver;
//! use prometheus_offer_engine::util::SystemClock;
//!
//! let driver = Arc::new(RecordingDriver::new());
//! let scheduler = build_scheduler(&SchedulerConfig::from_env()?, driver, Arc::new(SystemClock))?;
//!
//! let offers = vec![Offer::new("o1", "agent-1", "host-1", ResourceSet::cpus_mem(4.0, 8192.0))];
//! let pending = vec![TaskRequest::new("web-1", "web", ResourceSet::cpus_mem(2.0, 1024.0))];
//! let summary = scheduler.resource_offers(offers, &pending);
//! assert_eq!(summary.launched_tasks(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Offer bookkeeping, matching, and the scheduling pass.
pub mod core;
/// Configuration models for the cache and scheduling passes.
pub mod config;
/// Builders to construct caches and schedulers from configuration.
pub mod builders;
/// Cache backends and driver stand-ins.
pub mod infra;
/// Ingress loops and diagnostic surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
