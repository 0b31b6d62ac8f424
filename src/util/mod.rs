//! Shared utilities.

pub mod clock;
pub mod telemetry;
pub mod text;

pub use clock::*;
pub use telemetry::*;
pub use text::*;
