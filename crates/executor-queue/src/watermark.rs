// SPDX-License-Identifier: Apache-2.0

//! Edge-triggered high/low watermark tracking shared between a queue's
//! producer and consumer halves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use parking_lot::Mutex;

/// Observes watermark edge crossings for one queue.
///
/// Registered by value (not by string name), per the design note that
/// callbacks for watermarks and timers should be typed interfaces rather
/// than a heterogeneous, string-keyed lookup.
pub trait WatermarkObserver: Send + Sync {
    /// Fired the instant depth crosses the high watermark upward. Never
    /// fired again until a `low_water_mark` transition has occurred.
    fn high_water_mark(&self);

    /// Fired the instant depth crosses the low watermark downward, but only
    /// if the queue had previously crossed the high watermark.
    fn low_water_mark(&self);
}

pub(crate) struct WatermarkState {
    high: usize,
    low: usize,
    depth: AtomicUsize,
    above_high: AtomicBool,
    observer: Mutex<Option<Box<dyn WatermarkObserver>>>,
}

impl WatermarkState {
    pub(crate) fn new(capacity: usize, high_fraction: f64, low_fraction: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&low_fraction) && (0.0..=1.0).contains(&high_fraction) && low_fraction < high_fraction,
            "watermarks must satisfy 0 <= low < high <= 1"
        );
        let high = ((capacity as f64) * high_fraction).ceil() as usize;
        let low = ((capacity as f64) * low_fraction).floor() as usize;
        WatermarkState {
            high,
            low,
            depth: AtomicUsize::new(0),
            above_high: AtomicBool::new(false),
            observer: Mutex::new(None),
        }
    }

    pub(crate) fn record_publish(&self, n: usize) {
        let depth = self.depth.fetch_add(n, Ordering::AcqRel) + n;
        self.check_crossing(depth);
    }

    pub(crate) fn record_consume(&self, n: usize) {
        let depth = self.depth.fetch_sub(n, Ordering::AcqRel) - n;
        self.check_crossing(depth);
    }

    fn check_crossing(&self, depth: usize) {
        if depth >= self.high {
            if !self.above_high.swap(true, Ordering::AcqRel) {
                tracing::debug!(depth, high = self.high, "queue crossed high watermark");
                if let Some(observer) = self.observer.lock().as_ref() {
                    observer.high_water_mark();
                }
            }
        } else if depth <= self.low && self.above_high.swap(false, Ordering::AcqRel) {
            tracing::debug!(depth, low = self.low, "queue crossed low watermark");
            if let Some(observer) = self.observer.lock().as_ref() {
                observer.low_water_mark();
            }
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}

/// A shareable handle used to register a [`WatermarkObserver`] on a queue
/// (e.g. by a `BackpressureCoordinator`) independently of holding the
/// producer or consumer half.
#[derive(Clone)]
pub struct WatermarkHandle {
    pub(crate) state: Arc<WatermarkState>,
}

impl WatermarkHandle {
    /// Registers an observer, replacing any previously registered one.
    pub fn set_observer(&self, observer: impl WatermarkObserver + 'static) {
        *self.state.observer.lock() = Some(Box::new(observer));
    }

    /// Current queue depth in events (not batches).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.depth()
    }
}
