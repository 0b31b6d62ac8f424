//! Integration tests for the leased offer cache under concurrent use.
//!
//! This test validates:
//! 1. Concurrent checkouts never hand the same offer to two passes
//! 2. Rescissions racing checkouts and returns leave the cache consistent
//! 3. Peeking never disturbs checkout exclusivity
//! 4. Disabling the cache declines what it holds

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use rand::seq::SliceRandom;
use rand::Rng;

use prometheus_offer_engine::config::OfferCacheConfig;
use prometheus_offer_engine::core::{
    CachedOffer, Offer, OfferCache, OfferId, ResourceSet, ReturnOutcome,
};
use prometheus_offer_engine::infra::{LeasedOfferCache, RecordingDriver};
use prometheus_offer_engine::util::{now_ms, ManualClock};

fn offer(i: usize) -> Offer {
    Offer::new(
        format!("o{i}"),
        format!("agent-{}", i % 7),
        format!("host-{}", i % 7),
        ResourceSet::cpus_mem(1.0, 256.0),
    )
}

fn new_cache() -> (Arc<LeasedOfferCache>, Arc<RecordingDriver>) {
    let driver = Arc::new(RecordingDriver::new());
    let cache = Arc::new(LeasedOfferCache::new(OfferCacheConfig::default(), driver.clone()));
    (cache, driver)
}

#[test]
fn test_concurrent_checkouts_are_exclusive() {
    const OFFERS: usize = 500;
    const WORKERS: usize = 8;

    let (cache, _driver) = new_cache();
    let now = now_ms();
    for i in 0..OFFERS {
        cache.cache_offer(now, offer(i));
    }

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut claimed = Vec::new();
                for _ in 0..20 {
                    claimed.extend(
                        cache
                            .checkout_offers()
                            .into_iter()
                            .map(|cached| cached.id().clone()),
                    );
                }
                claimed
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("worker") {
            assert!(seen.insert(id.clone()), "offer {id} checked out twice");
        }
    }
    assert_eq!(seen.len(), OFFERS);
    assert_eq!(cache.checked_out_count(), OFFERS);
}

#[test]
fn test_return_and_rescind_race_keeps_cache_consistent() {
    const OFFERS: usize = 200;

    let (cache, _driver) = new_cache();
    let now = now_ms();
    for i in 0..OFFERS {
        cache.cache_offer(now, offer(i));
    }
    let mut claimed = cache.checkout_offers();
    claimed.shuffle(&mut rand::rng());

    let mut doomed: Vec<OfferId> = claimed
        .iter()
        .step_by(3)
        .map(|cached| cached.id().clone())
        .collect();
    doomed.shuffle(&mut rand::rng());
    let doomed_set: HashSet<OfferId> = doomed.iter().cloned().collect();

    let rescinder = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || doomed.iter().filter(|id| cache.rescind_offer(id)).count())
    };
    let returner = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            claimed
                .into_iter()
                .map(|cached| (cached.id().clone(), cache.return_offer(cached)))
                .collect::<Vec<_>>()
        })
    };

    let rescinded = rescinder.join().expect("rescinder");
    let outcomes = returner.join().expect("returner");

    assert_eq!(rescinded, doomed_set.len());
    for (id, outcome) in &outcomes {
        if !doomed_set.contains(id) {
            assert_eq!(*outcome, ReturnOutcome::Returned);
        }
        assert_ne!(*outcome, ReturnOutcome::Declined);
    }

    let available: HashSet<OfferId> = cache.peek_offers().into_iter().map(|o| o.id).collect();
    assert_eq!(available.len(), OFFERS - doomed_set.len());
    assert!(available.is_disjoint(&doomed_set));
    assert_eq!(cache.checked_out_count(), 0);
}

#[test]
fn test_peek_does_not_affect_checkout() {
    let (cache, _driver) = new_cache();
    let mut rng = rand::rng();
    let count = rng.random_range(1..50);
    let now = now_ms();
    for i in 0..count {
        cache.cache_offer(now, offer(i));
    }

    for _ in 0..3 {
        assert_eq!(cache.peek_offers().len(), count);
    }
    let claimed = cache.checkout_offers();
    assert_eq!(claimed.len(), count);
    assert!(cache.peek_offers().is_empty());
    assert!(cache.checkout_offers().is_empty());
}

#[test]
fn test_round_trip_return_makes_offer_available_again() {
    let (cache, _driver) = new_cache();
    cache.cache_offer(now_ms(), offer(1));

    let first = cache.checkout_offers();
    assert_eq!(first.len(), 1);
    let lease = first[0].lease();
    assert_eq!(cache.return_offer(first[0].clone()), ReturnOutcome::Returned);

    let second = cache.checkout_offers();
    assert_eq!(second.len(), 1);
    assert_ne!(second[0].lease(), lease);
    assert!(cache.use_offer(&second[0]));
    assert!(cache.is_empty());
}

#[test]
fn test_disable_declines_and_enable_resumes() {
    let (cache, driver) = new_cache();
    let now = now_ms();
    cache.cache_offer(now, offer(1));
    let held = cache.checkout_offers().remove(0);
    cache.cache_offer(now, offer(2));
    cache.cache_offer(now, offer(3));

    cache.disable_offer_cache();
    assert!(!cache.is_enabled());
    assert!(cache.peek_offers().is_empty());
    assert!(cache.checkout_offers().is_empty());
    cache.cache_offer(now, offer(4));

    assert_eq!(cache.return_offer(held), ReturnOutcome::Declined);
    let declined: HashSet<OfferId> = driver.declined().into_iter().collect();
    for i in 1..=4 {
        assert!(declined.contains(&OfferId::new(format!("o{i}"))), "o{i} not declined");
    }

    cache.enable_offer_cache();
    cache.cache_offer(now, offer(5));
    assert_eq!(cache.peek_offers().len(), 1);
}

#[test]
fn test_offers_expire_at_checkout() {
    let driver = Arc::new(RecordingDriver::new());
    let clock = Arc::new(ManualClock::new(10_000));
    let cfg = OfferCacheConfig {
        max_offer_age_ms: 1_000,
        ..OfferCacheConfig::default()
    };
    let cache = LeasedOfferCache::with_clock(cfg, driver.clone(), clock.clone());

    cache.cache_offer(10_000, offer(1));
    clock.advance(1_500);
    assert!(cache.checkout_offers().is_empty());
    assert_eq!(driver.declined(), vec![OfferId::new("o1")]);

    let passthrough = CachedOffer::new(offer(2), 11_500, 0);
    assert_eq!(cache.return_offer(passthrough), ReturnOutcome::Gone);
}
