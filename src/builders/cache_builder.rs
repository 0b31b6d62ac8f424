//! Builders selecting the offer cache variant from configuration.

use std::sync::Arc;

use tracing::info;

use crate::config::{OfferCacheConfig, SchedulerConfig};
use crate::core::{AuditSink, LaunchCommitter, OfferCache, OfferError, OfferResult, OfferScheduler};
use crate::infra::cache::{LeasedOfferCache, NullOfferCache};
use crate::util::clock::Clock;

/// Build the offer cache described by `cfg`.
///
/// `enabled = false` yields a [`NullOfferCache`] that declines everything;
/// otherwise a [`LeasedOfferCache`], with `audit` attached when given.
///
/// # Errors
///
/// [`OfferError::InvalidConfig`] if `cfg` fails validation.
pub fn build_offer_cache(
    cfg: &OfferCacheConfig,
    driver: Arc<dyn LaunchCommitter>,
    clock: Arc<dyn Clock>,
    audit: Option<Box<dyn AuditSink>>,
) -> OfferResult<Arc<dyn OfferCache>> {
    cfg.validate()
        .map_err(|e| OfferError::InvalidConfig(format!("cache config invalid: {e}")))?;

    if !cfg.enabled {
        info!("offer caching disabled by configuration");
        return Ok(Arc::new(NullOfferCache::new(driver)));
    }

    let mut cache = LeasedOfferCache::with_clock(cfg.clone(), driver, clock);
    if let Some(audit) = audit {
        cache = cache.with_audit(audit);
    }
    info!(
        max_offer_age_ms = cfg.max_offer_age_ms,
        flush_on_disable = cfg.flush_on_disable,
        "offer cache ready"
    );
    Ok(Arc::new(cache))
}

/// Build a scheduler and its cache from `cfg`.
///
/// # Errors
///
/// [`OfferError::InvalidConfig`] if `cfg` fails validation.
pub fn build_scheduler(
    cfg: &SchedulerConfig,
    driver: Arc<dyn LaunchCommitter>,
    clock: Arc<dyn Clock>,
) -> OfferResult<OfferScheduler> {
    cfg.validate()
        .map_err(|e| OfferError::InvalidConfig(format!("config invalid: {e}")))?;
    let cache = build_offer_cache(&cfg.cache, Arc::clone(&driver), Arc::clone(&clock), None)?;
    Ok(OfferScheduler::with_clock(cache, driver, cfg.clone(), clock))
}
