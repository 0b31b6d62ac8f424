//! In-memory driver that records calls instead of talking to a manager.

use parking_lot::Mutex;

use crate::core::driver::{DriverStatus, LaunchCommitter, LaunchSpec};
use crate::core::offer::OfferId;

/// A recorded launch call.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchCall {
    /// Offers the launch was issued against.
    pub offer_ids: Vec<OfferId>,
    /// Tasks launched.
    pub tasks: Vec<LaunchSpec>,
}

/// Driver for development and tests: records launches and declines and
/// answers with a configurable status.
pub struct RecordingDriver {
    launches: Mutex<Vec<LaunchCall>>,
    declines: Mutex<Vec<OfferId>>,
    launch_status: Mutex<DriverStatus>,
}

impl RecordingDriver {
    /// Create a driver that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            declines: Mutex::new(Vec::new()),
            launch_status: Mutex::new(DriverStatus::Running),
        }
    }

    /// Status returned by subsequent launch calls.
    pub fn set_launch_status(&self, status: DriverStatus) {
        *self.launch_status.lock() = status;
    }

    /// Launch calls seen so far.
    #[must_use]
    pub fn launches(&self) -> Vec<LaunchCall> {
        self.launches.lock().clone()
    }

    /// Declined offer ids, in call order.
    #[must_use]
    pub fn declined(&self) -> Vec<OfferId> {
        self.declines.lock().clone()
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchCommitter for RecordingDriver {
    fn launch_tasks(&self, offer_ids: &[OfferId], tasks: &[LaunchSpec]) -> DriverStatus {
        self.launches.lock().push(LaunchCall {
            offer_ids: offer_ids.to_vec(),
            tasks: tasks.to_vec(),
        });
        *self.launch_status.lock()
    }

    fn decline_offer(&self, offer_id: &OfferId) -> DriverStatus {
        self.declines.lock().push(offer_id.clone());
        DriverStatus::Running
    }
}
