//! Ingress loops and diagnostic surface.

pub mod api;
pub mod ingress;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_ingress;

pub use api::{cache_snapshot, CacheSnapshot, OfferView};
pub use ingress::{apply_event, IngressStats, ManagerEvent, OfferIngress};
#[cfg(feature = "tokio-runtime")]
pub use tokio_ingress::spawn_ingress;
