//! Resource-manager ingress as a tokio task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::cache::OfferCache;
use crate::core::error::{OfferError, OfferResult};
use crate::runtime::ingress::{apply_event, IngressStats, ManagerEvent};

/// Spawn an ingress task on the current tokio runtime.
///
/// The task ends once every sender is dropped and returns its counters.
/// Cache calls are short critical sections, so they run inline on the
/// async worker.
///
/// # Errors
///
/// Returns [`OfferError::Ingress`] if `capacity` is zero.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn spawn_ingress(
    cache: Arc<dyn OfferCache>,
    capacity: usize,
) -> OfferResult<(mpsc::Sender<ManagerEvent>, JoinHandle<IngressStats>)> {
    if capacity == 0 {
        return Err(OfferError::Ingress("capacity must be greater than 0".into()));
    }
    let (sender, mut receiver) = mpsc::channel::<ManagerEvent>(capacity);
    let handle = tokio::spawn(async move {
        debug!("async ingress started");
        let mut stats = IngressStats::default();
        while let Some(event) = receiver.recv().await {
            apply_event(cache.as_ref(), event, &mut stats);
        }
        info!(
            offers = stats.offers,
            rescinded = stats.rescinded,
            unknown_rescinds = stats.unknown_rescinds,
            "async ingress closed"
        );
        stats
    });
    Ok((sender, handle))
}
