//! Tests for configuration validation

use prometheus_offer_engine::config::{OfferCacheConfig, SchedulerConfig};

#[test]
fn test_cache_config_defaults() {
    let cfg = OfferCacheConfig::default();
    assert!(cfg.enabled);
    assert_eq!(cfg.max_offer_age_ms, 60_000);
    assert!(cfg.flush_on_disable);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_cache_config_invalid_age() {
    let cfg = OfferCacheConfig {
        max_offer_age_ms: 0,
        ..OfferCacheConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_defaults() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.task_size_hint, 8);
    assert!(cfg.commit_workers >= 1);
    assert_eq!(cfg.rack_attribute_key, "rack");
    assert_eq!(cfg.default_rack_id, "DEFAULT");
    assert!(cfg.reserved_agent_attributes.is_empty());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_workers() {
    let cfg = SchedulerConfig {
        commit_workers: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_nested_cache_error_is_reported() {
    let mut cfg = SchedulerConfig::default();
    cfg.cache.max_offer_age_ms = 0;
    let err = cfg.validate().expect_err("invalid cache");
    assert!(err.starts_with("cache invalid"));
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "cache": { "enabled": false, "max_offer_age_ms": 5000 },
        "task_size_hint": 4,
        "commit_workers": 2,
        "reserved_agent_attributes": { "dedicated": "ml" }
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).expect("valid config");
    assert!(!cfg.cache.enabled);
    assert_eq!(cfg.cache.max_offer_age_ms, 5000);
    assert!(cfg.cache.flush_on_disable);
    assert_eq!(cfg.task_size_hint, 4);
    assert_eq!(cfg.commit_workers, 2);
    assert_eq!(cfg.rack_attribute_key, "rack");
    assert_eq!(
        cfg.reserved_agent_attributes.get("dedicated").map(String::as_str),
        Some("ml")
    );
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "commit_workers": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}
