//! Offer cache backends.

pub mod memory;
pub mod null;

pub use memory::LeasedOfferCache;
pub use null::NullOfferCache;
