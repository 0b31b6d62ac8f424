//! Tests for builder functions

use std::sync::Arc;

use prometheus_offer_engine::builders::{build_offer_cache, build_scheduler};
use prometheus_offer_engine::config::{OfferCacheConfig, SchedulerConfig};
use prometheus_offer_engine::core::{Offer, OfferError, OfferId, ResourceSet};
use prometheus_offer_engine::infra::RecordingDriver;
use prometheus_offer_engine::util::SystemClock;

fn offer(id: &str) -> Offer {
    Offer::new(id, "agent-1", "host-1", ResourceSet::cpus_mem(1.0, 256.0))
}

#[test]
fn test_enabled_config_builds_caching_cache() {
    let driver = Arc::new(RecordingDriver::new());
    let cache = build_offer_cache(
        &OfferCacheConfig::default(),
        driver.clone(),
        Arc::new(SystemClock),
        None,
    )
    .expect("cache");

    assert!(cache.is_enabled());
    cache.cache_offer(prometheus_offer_engine::util::now_ms(), offer("o1"));
    assert_eq!(cache.peek_offers().len(), 1);
    assert!(driver.declined().is_empty());
}

#[test]
fn test_disabled_config_builds_null_cache() {
    let driver = Arc::new(RecordingDriver::new());
    let cfg = OfferCacheConfig {
        enabled: false,
        ..OfferCacheConfig::default()
    };
    let cache = build_offer_cache(&cfg, driver.clone(), Arc::new(SystemClock), None).expect("cache");

    assert!(!cache.is_enabled());
    cache.cache_offer(0, offer("o1"));
    assert!(cache.peek_offers().is_empty());
    assert_eq!(driver.declined(), vec![OfferId::new("o1")]);

    cache.enable_offer_cache();
    assert!(!cache.is_enabled());
}

#[test]
fn test_invalid_config_is_rejected() {
    let cfg = OfferCacheConfig {
        max_offer_age_ms: 0,
        ..OfferCacheConfig::default()
    };
    let result = build_offer_cache(
        &cfg,
        Arc::new(RecordingDriver::new()),
        Arc::new(SystemClock),
        None,
    );
    assert!(matches!(result, Err(OfferError::InvalidConfig(_))));
}

#[test]
fn test_build_scheduler_uses_config() {
    let cfg = SchedulerConfig {
        commit_workers: 3,
        ..SchedulerConfig::default()
    };
    let scheduler = build_scheduler(&cfg, Arc::new(RecordingDriver::new()), Arc::new(SystemClock))
        .expect("scheduler");
    assert_eq!(scheduler.config().commit_workers, 3);
    assert!(scheduler.cache().is_enabled());

    let bad = SchedulerConfig {
        commit_workers: 0,
        ..SchedulerConfig::default()
    };
    assert!(build_scheduler(&bad, Arc::new(RecordingDriver::new()), Arc::new(SystemClock)).is_err());
}
