//! Clear-on-read action flags shared between interrupt context and the main loop

use std::sync::atomic::{AtomicBool, Ordering};

/// Pending appliance actions posted by the key classifier.
///
/// Flags are set from the GPIO delivery thread and consumed by the main loop.
/// Consumption is read-and-clear via `swap`, so a set that races a take lands
/// on the next take instead of being lost, and any single set is observed as
/// true exactly once.
#[derive(Debug, Default)]
pub struct PendingActions {
    shutdown: AtomicBool,
    capture: AtomicBool,
    eject: AtomicBool,
}

impl PendingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Take the shutdown request, clearing it.
    pub fn take_shutdown(&self) -> bool {
        self.shutdown.swap(false, Ordering::AcqRel)
    }

    pub fn request_capture(&self) {
        self.capture.store(true, Ordering::Release);
    }

    /// Take the capture request, clearing it.
    pub fn take_capture(&self) -> bool {
        self.capture.swap(false, Ordering::AcqRel)
    }

    pub fn request_eject(&self) {
        self.eject.store(true, Ordering::Release);
    }

    /// Take the eject request, clearing it.
    pub fn take_eject(&self) -> bool {
        self.eject.swap(false, Ordering::AcqRel)
    }
}
