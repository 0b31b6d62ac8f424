//! Tests for error types

use prometheus_offer_engine::core::{DriverStatus, OfferError, OfferId, ResourceSet};

#[test]
fn test_unknown_offer_error() {
    let err = OfferError::UnknownOffer(OfferId::new("o-17"));
    assert_eq!(format!("{err}"), "unknown offer: o-17");
}

#[test]
fn test_insufficient_resources_from_subtract() {
    let pool = ResourceSet::cpus_mem(1.0, 512.0);
    let err = pool
        .subtract(&ResourceSet::cpus_mem(2.0, 128.0))
        .expect_err("cpus exceed the pool");
    assert_eq!(
        format!("{err}"),
        "insufficient cpus: requested 2, available 1"
    );
}

#[test]
fn test_commit_failure_error() {
    let err = OfferError::CommitFailure {
        status: DriverStatus::Aborted,
        offers: vec![OfferId::new("o1")],
    };
    let text = format!("{err}");
    assert!(text.contains("DRIVER_ABORTED"));
    assert!(text.contains("o1"));
}

#[test]
fn test_integrity_violation_error() {
    let err = OfferError::IntegrityViolation("mixed agents".to_string());
    assert_eq!(format!("{err}"), "integrity violation: mixed agents");
}

#[test]
fn test_invalid_config_error() {
    let err = OfferError::InvalidConfig("max_offer_age_ms must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: max_offer_age_ms must be greater than 0"
    );
}

#[test]
fn test_ingress_error_converts_to_anyhow() {
    fn app() -> prometheus_offer_engine::core::AppResult<()> {
        Err(OfferError::Ingress("closed".to_string()))?;
        Ok(())
    }
    let err = app().expect_err("ingress error");
    assert_eq!(err.to_string(), "ingress error: closed");
}
