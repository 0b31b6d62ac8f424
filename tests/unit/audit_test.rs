//! Tests for the offer audit sink

use prometheus_offer_engine::core::{
    build_offer_event, AuditSink, InMemoryAuditSink, OfferAction, OfferId, OfferState,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_offer_event(
        OfferId::new("o1"),
        OfferAction::Cached,
        Some(OfferState::Available),
        Some("fresh".to_string()),
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].offer_id, OfferId::new("o1"));
    assert_eq!(events[0].action, OfferAction::Cached);
    assert_eq!(events[0].state, Some(OfferState::Available));
    assert!(!events[0].event_id.is_empty());
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_offer_event(OfferId::new("o1"), OfferAction::Cached, None, None));
    sink.record(build_offer_event(OfferId::new("o2"), OfferAction::Cached, None, None));
    sink.record(build_offer_event(OfferId::new("o3"), OfferAction::Cached, None, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].offer_id, OfferId::new("o2"));
    assert_eq!(events[1].offer_id, OfferId::new("o3"));
}

#[test]
fn test_event_serializes_action_in_snake_case() {
    let event = build_offer_event(
        OfferId::new("o1"),
        OfferAction::CheckedOut,
        Some(OfferState::CheckedOut),
        None,
    );
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(json["action"], "checked_out");
    assert_eq!(json["offer_id"], "o1");
}
