// SPDX-License-Identifier: Apache-2.0

//! Wires `receive_queue`'s watermark crossings to an executor-scoped
//! backpressure flag and notifies the worker (`spec.md` §4.6).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use executor_queue::WatermarkObserver;

/// Notified on every backpressure flag transition. `true` means the
/// high watermark was just crossed upward; `false` means the low
/// watermark was just crossed downward.
pub type BackpressureTrigger = Arc<dyn Fn(bool) + Send + Sync>;

/// Observes `receive_queue`'s watermark and flips an executor-scoped
/// atomic flag on edge crossings, notifying the worker each time it
/// actually transitions.
///
/// Enable/disable is the caller's responsibility (`topology.backpressure.enable`
/// in `spec.md` §4.6): when disabled, simply don't register this observer
/// on the queue's `WatermarkHandle`.
pub struct BackpressureCoordinator {
    flag: Arc<AtomicBool>,
    trigger: BackpressureTrigger,
}

impl BackpressureCoordinator {
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>, trigger: BackpressureTrigger) -> Self {
        BackpressureCoordinator { flag, trigger }
    }

    /// Current backpressure state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl WatermarkObserver for BackpressureCoordinator {
    fn high_water_mark(&self) {
        // The queue already edge-triggers (fires only on the upward
        // crossing), so every call here is a real transition.
        self.flag.store(true, Ordering::Release);
        (self.trigger)(true);
    }

    fn low_water_mark(&self) {
        self.flag.store(false, Ordering::Release);
        (self.trigger)(false);
    }
}
