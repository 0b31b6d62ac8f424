//! Tests for the diagnostic surface

use std::sync::Arc;

use prometheus_offer_engine::config::OfferCacheConfig;
use prometheus_offer_engine::core::{Offer, OfferCache, ResourceSet};
use prometheus_offer_engine::infra::{LeasedOfferCache, RecordingDriver};
use prometheus_offer_engine::runtime::cache_snapshot;

#[test]
fn test_snapshot_lists_available_offers_without_claiming() {
    let cache = LeasedOfferCache::new(OfferCacheConfig::default(), Arc::new(RecordingDriver::new()));
    let now = prometheus_offer_engine::util::now_ms();
    cache.cache_offer(
        now,
        Offer::new("o1", "agent-1", "host-1", ResourceSet::cpus_mem(2.0, 1024.0)).with_role("*"),
    );
    cache.cache_offer(
        now,
        Offer::new("o2", "agent-2", "host-2", ResourceSet::cpus_mem(1.0, 512.0)),
    );

    let snapshot = cache_snapshot(&cache);
    assert!(snapshot.enabled);
    assert_eq!(snapshot.offers.len(), 2);
    assert_eq!(snapshot.offers[0].offer_id, "o1");
    assert_eq!(snapshot.offers[0].resources, "{cpus:2, mem:1024}");
    assert_eq!(snapshot.offers[0].roles, vec!["*".to_string()]);

    assert_eq!(cache.checkout_offers().len(), 2);
    assert!(cache_snapshot(&cache).offers.is_empty());
}

#[test]
fn test_snapshot_serializes() {
    let cache = LeasedOfferCache::new(OfferCacheConfig::default(), Arc::new(RecordingDriver::new()));
    cache.disable_offer_cache();
    let json = serde_json::to_string(&cache_snapshot(&cache)).expect("serialize");
    assert_eq!(json, r#"{"enabled":false,"offers":[]}"#);
}
