//! Driver backends.

pub mod memory;

pub use memory::{LaunchCall, RecordingDriver};
