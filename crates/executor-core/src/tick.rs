// SPDX-License-Identifier: Apache-2.0

//! System-tick and metrics-tick scheduling (`spec.md` §4.5). Both jobs
//! publish broadcast `AddressedTuple`s into the executor's own
//! `receive_queue`.

use std::time::Duration;

use executor_model::{
    ComponentId, Destination, METRICS_TICK_STREAM, SYSTEM_TASK_ID, TICK_STREAM, Tuple, Values,
};
use executor_queue::{Batch, QueueProducer};
use tokio_util::sync::CancellationToken;

/// Runs the system tick and any registered metrics-tick jobs, publishing
/// into `receive_queue` until cancelled.
pub struct TickScheduler {
    receive_queue: QueueProducer<executor_model::AddressedTuple>,
}

impl TickScheduler {
    #[must_use]
    pub fn new(receive_queue: QueueProducer<executor_model::AddressedTuple>) -> Self {
        TickScheduler { receive_queue }
    }

    /// Runs the system tick job every `freq_secs`, suppressed entirely when
    /// `suppressed` is true (the component id is a system id, or it is a
    /// spout with message timeouts disabled). Guarantees at most one
    /// outstanding tick: a slow consumer causes ticks to be skipped, not
    /// queued up, via `tokio::time::interval`'s default `Burst` behavior
    /// replaced with `MissedTickBehavior::Skip`.
    pub async fn run_system_tick(
        &self,
        freq_secs: u64,
        suppressed: bool,
        cancel: CancellationToken,
    ) {
        if suppressed || freq_secs == 0 {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(freq_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = interval.tick() => {
                    let tuple = Tuple::new(
                        SYSTEM_TASK_ID,
                        TICK_STREAM,
                        Values::single("freq_secs", serde_json::Value::from(freq_secs)),
                        None,
                    );
                    let addressed =
                        executor_model::AddressedTuple::new(Destination::Broadcast, tuple);
                    if self
                        .receive_queue
                        .publish(Batch::single(addressed))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }
    }

    /// Runs one metrics-tick job for a single registered interval.
    pub async fn run_metrics_tick(&self, interval_secs: u64, cancel: CancellationToken) {
        if interval_secs == 0 {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = interval.tick() => {
                    let tuple = Tuple::new(
                        SYSTEM_TASK_ID,
                        METRICS_TICK_STREAM,
                        Values::single("interval_secs", serde_json::Value::from(interval_secs)),
                        None,
                    );
                    let addressed =
                        executor_model::AddressedTuple::new(Destination::Broadcast, tuple);
                    if self
                        .receive_queue
                        .publish(Batch::single(addressed))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }
    }
}

/// Returns true if `component_id` is a system-reserved component whose
/// system tick must be suppressed (`spec.md` §4.5).
#[must_use]
pub fn is_system_component(component_id: &ComponentId) -> bool {
    component_id.starts_with("__")
}
