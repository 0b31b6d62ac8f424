//! Tests for utility functions

use prometheus_offer_engine::util::{
    init_tracing, now_ms, replace_hyphens_with_underscores, Clock, ManualClock, SystemClock,
};

#[test]
fn test_now_ms_tracks_system_clock() {
    let before = now_ms();
    let clock = SystemClock.now_ms();
    assert!(clock >= before);
}

#[test]
fn test_manual_clock_is_deterministic() {
    let clock = ManualClock::new(5_000);
    clock.advance(1_000);
    assert_eq!(clock.now_ms(), 6_000);
}

#[test]
fn test_label_sanitizing() {
    assert_eq!(replace_hyphens_with_underscores("rack-a-1"), "rack_a_1");
    assert_eq!(replace_hyphens_with_underscores(""), "");
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
