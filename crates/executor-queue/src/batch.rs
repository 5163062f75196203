// SPDX-License-Identifier: Apache-2.0

//! A batch of events published or consumed as a unit.

/// A batch of events. Publishers may accumulate up to `batch_size` events or
/// `batch_timeout_ms` before a batch becomes visible to the consumer; that
/// accumulation is the publisher's job (see `executor-transfer`'s staging
/// buffer) — `Batch` itself is just the unit the queue moves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch<T>(pub Vec<T>);

impl<T> Batch<T> {
    /// Wraps a single event as a one-element batch.
    #[must_use]
    pub fn single(event: T) -> Self {
        Batch(vec![event])
    }

    /// Wraps a vector of events as a batch.
    #[must_use]
    pub fn from_vec(events: Vec<T>) -> Self {
        Batch(events)
    }

    /// Number of events in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the batch carries no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
