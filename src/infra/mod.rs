//! Infrastructure adapters: cache backends and driver stand-ins.

pub mod cache;
pub mod driver;

pub use cache::{LeasedOfferCache, NullOfferCache};
pub use driver::RecordingDriver;
