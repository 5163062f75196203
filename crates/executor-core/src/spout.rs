// SPDX-License-Identifier: Apache-2.0

//! Spout specialization of the event loop (`spec.md` §4.9).
//!
//! A spout has no inbound data tuples from other components; its inbound
//! dispatch services ticks, metrics ticks, and ack/fail notifications.
//! Outbound emission is driven separately, by [`SpoutExecutor::maybe_next_tuple`],
//! called by the host loop under whatever wait strategy it implements
//! between batches.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::Ordering;

use executor_model::{ACK_STREAM, FAIL_STREAM, METRICS_TICK_STREAM, TICK_STREAM, TaskId, Tuple};

use crate::core::{ExecutorCore, TupleActionFuture};
use crate::error::Error;
use crate::logic::PendingOutcome;

/// Counts not-yet-acked/failed message ids per task, used only to gate
/// `max_spout_pending` (`spec.md` §4.9). Timeout scanning over pending
/// messages is spout-owned and explicitly not expanded by `spec.md` §4.9,
/// so this tracker does no more than the gating check requires.
#[derive(Debug, Default)]
struct PendingTracker {
    pending: HashMap<TaskId, BTreeSet<u64>>,
}

impl PendingTracker {
    fn count(&self, task_id: TaskId) -> usize {
        self.pending.get(&task_id).map_or(0, BTreeSet::len)
    }

    fn insert(&mut self, task_id: TaskId, message_id: u64) {
        self.pending.entry(task_id).or_default().insert(message_id);
    }

    fn remove(&mut self, task_id: TaskId, message_id: u64) {
        if let Some(set) = self.pending.get_mut(&task_id) {
            set.remove(&message_id);
        }
    }
}

/// Wraps [`ExecutorCore`] with the spout `tuple_action`.
pub struct SpoutExecutor {
    core: ExecutorCore,
    pending: PendingTracker,
    next_message_id: u64,
}

impl SpoutExecutor {
    #[must_use]
    pub fn new(core: ExecutorCore) -> Self {
        SpoutExecutor {
            core,
            pending: PendingTracker::default(),
            next_message_id: 0,
        }
    }

    #[must_use]
    pub fn core(&self) -> &ExecutorCore {
        &self.core
    }

    /// Current pending-message count for `task_id`, for tests and stats
    /// reporting.
    #[must_use]
    pub fn pending_count(&self, task_id: TaskId) -> usize {
        self.pending.count(task_id)
    }

    /// Drains and dispatches exactly one batch from `receive_queue`: ticks,
    /// metrics ticks, and ack/fail notifications.
    ///
    /// # Errors
    ///
    /// Propagates queue, registry, and transfer errors, plus whatever a
    /// user spout's `ack`/`fail` call returns.
    pub async fn drive_one_batch(&mut self) -> Result<(), Error> {
        let pending = &mut self.pending;
        self.core
            .drive_one_batch(move |core, task_id, tuple| dispatch_to_spout(core, task_id, tuple, pending))
            .await
    }

    /// Calls user `next_tuple()` for `task_id` if `storm_active` is set,
    /// `throttle_on` is clear, and the task's pending-message count is
    /// below `max_spout_pending` (when configured). Stamps and emits
    /// whatever the spout returns with a fresh message id, anchoring it
    /// into the pending tracker. Returns `true` if a tuple was emitted.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the user spout's `next_tuple` call,
    /// grouping resolution, or emission returns.
    pub async fn maybe_next_tuple(
        &mut self,
        task_id: TaskId,
        max_spout_pending: Option<usize>,
    ) -> Result<bool, Error> {
        if !self.core.worker().storm_active.load(Ordering::Relaxed) {
            return Ok(false);
        }
        if self.core.worker().throttle_on.load(Ordering::Relaxed) {
            return Ok(false);
        }
        if let Some(max) = max_spout_pending {
            if self.pending.count(task_id) >= max {
                return Ok(false);
            }
        }

        let task = self.core.task_mut(task_id).ok_or_else(|| Error::Fatal {
            message: format!("maybe_next_tuple: unknown task {task_id}"),
        })?;
        let spout = task.logic_mut().as_spout_mut().ok_or_else(|| Error::Fatal {
            message: format!("task {task_id} is not a spout"),
        })?;

        let Some((stream, values)) = spout.next_tuple().await? else {
            return Ok(false);
        };

        let message_id = self.next_message_id;
        self.next_message_id += 1;
        task.emit_anchored(stream, values, None, Some(message_id))?;
        self.pending.insert(task_id, message_id);
        Ok(true)
    }
}

fn dispatch_to_spout<'a>(
    core: &'a mut ExecutorCore,
    task_id: TaskId,
    tuple: Tuple,
    pending: &'a mut PendingTracker,
) -> TupleActionFuture<'a> {
    Box::pin(async move {
        match tuple.source_stream_id.as_str() {
            METRICS_TICK_STREAM => core.metrics_tick(task_id, &tuple),
            TICK_STREAM => {
                if let Some(task) = core.task_mut(task_id) {
                    task.record_tick();
                }
                Ok(())
            }
            ACK_STREAM => {
                let message_id = extract_message_id(&tuple)?;
                apply_pending_outcome(core, pending, PendingOutcome::Ack { task_id, message_id }).await
            }
            FAIL_STREAM => {
                let message_id = extract_message_id(&tuple)?;
                apply_pending_outcome(core, pending, PendingOutcome::Fail { task_id, message_id }).await
            }
            other => {
                tracing::warn!(stream = other, task_id, "spout received unexpected inbound stream; dropping");
                Ok(())
            }
        }
    })
}

/// Routes a [`PendingOutcome`] to the owning spout's `ack`/`fail` call and
/// clears its pending-message slot.
async fn apply_pending_outcome(
    core: &mut ExecutorCore,
    pending: &mut PendingTracker,
    outcome: PendingOutcome,
) -> Result<(), Error> {
    let (task_id, message_id) = match outcome {
        PendingOutcome::Ack { task_id, message_id } | PendingOutcome::Fail { task_id, message_id } => {
            (task_id, message_id)
        }
    };
    let task = core.task_mut(task_id).ok_or_else(|| Error::Fatal {
        message: format!("spout ack/fail dispatch: unknown task {task_id}"),
    })?;
    let spout = task.logic_mut().as_spout_mut().ok_or_else(|| Error::Fatal {
        message: format!("task {task_id} is not a spout"),
    })?;
    match outcome {
        PendingOutcome::Ack { message_id, .. } => spout.ack(message_id).await?,
        PendingOutcome::Fail { message_id, .. } => spout.fail(message_id).await?,
    }
    pending.remove(task_id, message_id);
    Ok(())
}

fn extract_message_id(tuple: &Tuple) -> Result<u64, Error> {
    tuple
        .fields
        .values()
        .next()
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| Error::Fatal {
            message: "ack/fail tuple missing integer message id field".to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::{ExecutorCore, MetricsRegistry, WorkerHandle};
    use crate::logic::{ComponentLogic, Spout};
    use crate::task::Task;
    use executor_grouping::{GrouperRegistry, StreamGroupingTable, WorkerTopology};
    use executor_model::{AddressedTuple, Destination, Values};
    use executor_queue::{Batch, new_queue};
    use executor_transfer::WorkerAddressResolver;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingSpout {
        next_calls: Arc<AtomicUsize>,
        ack_calls: Arc<AtomicUsize>,
        fail_calls: Arc<AtomicUsize>,
        emit_next: bool,
    }

    #[async_trait::async_trait(?Send)]
    impl Spout for CountingSpout {
        async fn next_tuple(&mut self) -> Result<Option<(String, Values)>, Error> {
            self.next_calls.fetch_add(1, Ordering::SeqCst);
            if self.emit_next {
                Ok(Some(("default".to_string(), Values::new(vec![]))))
            } else {
                Ok(None)
            }
        }

        async fn ack(&mut self, _message_id: u64) -> Result<(), Error> {
            self.ack_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn fail(&mut self, _message_id: u64) -> Result<(), Error> {
            self.fail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoMetrics;
    impl MetricsRegistry for NoMetrics {
        fn collect(&self, _task_id: TaskId, _interval_secs: u64) -> Vec<(String, Option<f64>)> {
            Vec::new()
        }
    }

    struct AllLocal;
    impl WorkerAddressResolver for AllLocal {
        fn worker_of(&self, _task_id: TaskId) -> Option<String> {
            Some("w1".to_string())
        }
    }

    fn worker_handle(storm_active: bool, throttle_on: bool) -> WorkerHandle {
        WorkerHandle {
            storm_active: Arc::new(AtomicBool::new(storm_active)),
            throttle_on: Arc::new(AtomicBool::new(throttle_on)),
            storm_component_debug: Arc::new(AtomicBool::new(false)),
            task_to_component: Arc::new(BTreeMap::new()),
            suicide_fn: Arc::new(|_| {}),
            host: "localhost".to_string(),
            port: 6700,
        }
    }

    fn build_spout_executor(
        spout: CountingSpout,
        worker: WorkerHandle,
    ) -> (SpoutExecutor, executor_queue::QueueConsumer<(String, Tuple)>, executor_queue::QueueProducer<AddressedTuple>) {
        let mut table = StreamGroupingTable::new();
        table.declare_unsubscribed("default");
        let topology = WorkerTopology::new(HashMap::new(), HashMap::new(), "w1".to_string());
        let groupers = Arc::new(GrouperRegistry::build(table, topology));
        let (transfer_producer, transfer_consumer, _wm) = new_queue::<(String, Tuple)>(64, 0.8, 0.2);
        let (transfer, drain) = executor_transfer::new(Arc::new(AllLocal), transfer_producer);
        std::mem::forget(drain);

        let task = Task::new(
            5,
            "spout-a".to_string(),
            groupers,
            transfer,
            ComponentLogic::Spout(Box::new(spout)),
        )
        .unwrap();
        let mut tasks = BTreeMap::new();
        tasks.insert(5, task);

        let (producer, consumer, _wm) = new_queue::<AddressedTuple>(64, 0.8, 0.2);
        let core = ExecutorCore::new(tasks, consumer, Config::default(), worker, Arc::new(NoMetrics));
        (SpoutExecutor::new(core), transfer_consumer, producer)
    }

    #[tokio::test]
    async fn next_tuple_respects_storm_active_and_throttle() {
        let next_calls = Arc::new(AtomicUsize::new(0));
        let spout = CountingSpout {
            next_calls: next_calls.clone(),
            ack_calls: Arc::new(AtomicUsize::new(0)),
            fail_calls: Arc::new(AtomicUsize::new(0)),
            emit_next: false,
        };
        let (mut executor, _transfer_consumer, _producer) =
            build_spout_executor(spout, worker_handle(false, false));

        let emitted = executor.maybe_next_tuple(5, None).await.unwrap();
        assert!(!emitted);
        assert_eq!(next_calls.load(Ordering::SeqCst), 0, "inactive storm must not call next_tuple");
    }

    #[tokio::test]
    async fn max_spout_pending_gates_further_emission_until_ack() {
        let next_calls = Arc::new(AtomicUsize::new(0));
        let ack_calls = Arc::new(AtomicUsize::new(0));
        let spout = CountingSpout {
            next_calls: next_calls.clone(),
            ack_calls: ack_calls.clone(),
            fail_calls: Arc::new(AtomicUsize::new(0)),
            emit_next: true,
        };
        let (mut executor, mut transfer_consumer, producer) =
            build_spout_executor(spout, worker_handle(true, false));
        // Drain the startup notice.
        transfer_consumer.consume(|_, _, _| {}).await.unwrap();

        let first = executor.maybe_next_tuple(5, Some(1)).await.unwrap();
        assert!(first);
        assert_eq!(executor.pending_count(5), 1);

        let second = executor.maybe_next_tuple(5, Some(1)).await.unwrap();
        assert!(!second, "pending count at max_spout_pending must gate next_tuple");

        // Deliver the ack, which should clear the pending slot.
        let ack_tuple = Tuple::new(
            executor_model::SYSTEM_TASK_ID,
            ACK_STREAM,
            Values::single("message_id", 0.into()),
            None,
        );
        producer
            .publish(Batch::single(AddressedTuple::new(Destination::Task(5), ack_tuple)))
            .await
            .unwrap();
        executor.drive_one_batch().await.unwrap();

        assert_eq!(ack_calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.pending_count(5), 0);

        let third = executor.maybe_next_tuple(5, Some(1)).await.unwrap();
        assert!(third, "clearing the pending slot must unblock next_tuple");
    }
}
