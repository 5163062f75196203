// SPDX-License-Identifier: Apache-2.0

//! Per-task binding of user logic to a `task_id`, plus outgoing-task
//! resolution through the grouper registry (`spec.md` §4.4).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use executor_grouping::GrouperRegistry;
use executor_model::{ComponentId, SYSTEM_STREAM, StreamId, TaskId, Tuple, Values};
use executor_transfer::ExecutorTransfer;

use crate::error::Error;
use crate::logic::ComponentLogic;

/// Per-task counters and rate-limit state, named but left unspecified by
/// `spec.md` §3 ("a stats accumulator").
#[derive(Debug, Default)]
pub struct TaskStats {
    emitted_per_stream: BTreeMap<StreamId, u64>,
    transferred: u64,
    ticks_received: u64,
    error_report_count: u32,
    error_report_window_start: Option<Instant>,
}

impl TaskStats {
    #[must_use]
    pub fn new() -> Self {
        TaskStats::default()
    }

    fn record_emit(&mut self, stream_id: &str, transfers: usize) {
        *self
            .emitted_per_stream
            .entry(stream_id.to_owned())
            .or_insert(0) += 1;
        self.transferred += transfers as u64;
    }

    /// Token-bucket rate check for `ReportError`: allows up to `limit`
    /// reports per `window`, resetting the window once it elapses.
    /// Returns `true` if this report is allowed to proceed.
    pub fn allow_error_report(&mut self, limit: u32, window: std::time::Duration) -> bool {
        let now = Instant::now();
        match self.error_report_window_start {
            Some(start) if now.duration_since(start) < window => {
                if self.error_report_count < limit {
                    self.error_report_count += 1;
                    true
                } else {
                    false
                }
            }
            _ => {
                self.error_report_window_start = Some(now);
                self.error_report_count = 1;
                true
            }
        }
    }

    #[must_use]
    pub fn emitted_on(&self, stream_id: &str) -> u64 {
        self.emitted_per_stream.get(stream_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn record_tick(&mut self) {
        self.ticks_received += 1;
    }

    /// Number of `__tick` system ticks delivered to this task so far.
    #[must_use]
    pub fn ticks_received(&self) -> u64 {
        self.ticks_received
    }
}

/// Binds one `task_id` to user logic and its compiled outgoing groupers.
pub struct Task {
    task_id: TaskId,
    component_id: ComponentId,
    groupers: Arc<GrouperRegistry>,
    transfer: ExecutorTransfer,
    stats: TaskStats,
    logic: ComponentLogic,
}

impl Task {
    /// Builds a new task and immediately emits the `"startup"` notice on
    /// `__system`, before any user code runs — per the invariant that
    /// tasks are created exactly once, before either loop starts, and that
    /// ACK trackers must learn of a task's existence before user logic
    /// fires (`spec.md` §4.4, scenario 5).
    ///
    /// # Errors
    ///
    /// Propagates a [`Error::Transfer`] if the startup notice could not be
    /// staged (the transfer drain loop has already shut down).
    pub fn new(
        task_id: TaskId,
        component_id: ComponentId,
        groupers: Arc<GrouperRegistry>,
        transfer: ExecutorTransfer,
        logic: ComponentLogic,
    ) -> Result<Self, Error> {
        let mut task = Task {
            task_id,
            component_id,
            groupers,
            transfer,
            stats: TaskStats::new(),
            logic,
        };
        task.send_startup_notice()?;
        Ok(task)
    }

    fn send_startup_notice(&mut self) -> Result<(), Error> {
        let tuple = self.make_tuple(SYSTEM_STREAM, Values::single("startup", "startup".into()));
        // Unanchored: no message id, not tracked by ACK chains.
        self.transfer.transfer(self.task_id, tuple)?;
        Ok(())
    }

    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    #[must_use]
    pub fn component_id(&self) -> &ComponentId {
        &self.component_id
    }

    #[must_use]
    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    /// Records delivery of one `__tick` system tick, per `spec.md` §4.8's
    /// "update tick stats".
    pub fn record_tick(&mut self) {
        self.stats.record_tick();
    }

    #[must_use]
    pub fn logic_mut(&mut self) -> &mut ComponentLogic {
        &mut self.logic
    }

    /// Stamps a new tuple with this task as its source.
    #[must_use]
    pub fn make_tuple(&self, stream_id: impl Into<StreamId>, values: Values) -> Tuple {
        Tuple::new(self.task_id, stream_id, values, None)
    }

    /// Consults the grouper for each subscribing downstream component and
    /// flattens the results in component-declaration order. Empty iff the
    /// stream has no subscribers.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Registry`] for an undeclared stream or an
    /// invalid `Direct` destination.
    pub fn outgoing_tasks(
        &self,
        stream_id: &str,
        values: &Values,
        direct_dest: Option<TaskId>,
    ) -> Result<Vec<TaskId>, Error> {
        Ok(self
            .groupers
            .outgoing_tasks(stream_id, values, direct_dest, None)?)
    }

    /// Composes `make_tuple` + `outgoing_tasks` + `ExecutorTransfer::transfer`:
    /// builds the tuple, resolves its downstream tasks, and stages it for
    /// transfer to each.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Registry`] from resolution or
    /// [`Error::Transfer`] if staging fails.
    pub fn emit(
        &mut self,
        stream_id: impl Into<StreamId>,
        values: Values,
        direct_dest: Option<TaskId>,
    ) -> Result<Vec<TaskId>, Error> {
        self.emit_anchored(stream_id, values, direct_dest, None)
    }

    /// As [`Task::emit`], but stamps the outbound tuple with `message_id` so
    /// an (out-of-scope) ack-tracking collaborator can anchor it to a spout's
    /// pending-message chain.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Registry`] from resolution or
    /// [`Error::Transfer`] if staging fails.
    pub fn emit_anchored(
        &mut self,
        stream_id: impl Into<StreamId>,
        values: Values,
        direct_dest: Option<TaskId>,
        message_id: Option<u64>,
    ) -> Result<Vec<TaskId>, Error> {
        let stream_id = stream_id.into();
        let tuple = Tuple::new(self.task_id, stream_id.clone(), values, message_id);
        let targets = self.outgoing_tasks(&stream_id, &tuple.fields, direct_dest)?;
        for &target in &targets {
            self.transfer.transfer(target, tuple.clone())?;
        }
        self.stats.record_emit(&stream_id, targets.len());
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_grouping::{GrouperKind, StreamGroupingTable, WorkerTopology};
    use executor_queue::new_queue;
    use std::collections::HashMap;

    struct NoopBolt;

    #[async_trait::async_trait(?Send)]
    impl crate::logic::Bolt for NoopBolt {
        async fn execute(&mut self, _tuple: &Tuple) -> Result<(), Error> {
            Ok(())
        }
    }

    fn noop_logic() -> ComponentLogic {
        ComponentLogic::Bolt(Box::new(NoopBolt))
    }

    fn registry() -> Arc<GrouperRegistry> {
        let mut table = StreamGroupingTable::new();
        table.subscribe("__system", "acker", GrouperKind::All, vec![1]);
        table.declare_unsubscribed("default");
        let topology = WorkerTopology::new(HashMap::new(), HashMap::new(), "w1".to_string());
        Arc::new(GrouperRegistry::build(table, topology))
    }

    #[tokio::test]
    async fn construction_emits_startup_notice_before_any_user_call() {
        // Scenario 5 from spec.md §8.
        let (producer, mut consumer, _watermarks) = new_queue::<(String, Tuple)>(8, 0.8, 0.2);
        let mut resolver_map = HashMap::new();
        resolver_map.insert(7i64, "w1".to_string());
        struct R(HashMap<TaskId, String>);
        impl executor_transfer::WorkerAddressResolver for R {
            fn worker_of(&self, task_id: TaskId) -> Option<String> {
                self.0.get(&task_id).cloned()
            }
        }
        let (transfer, drain) = executor_transfer::new(Arc::new(R(resolver_map)), producer);
        let cancel = tokio_util::sync::CancellationToken::new();
        let cancel_for_drain = cancel.clone();
        let drain_handle = tokio::spawn(drain.run(cancel_for_drain));

        let _task = Task::new(7, "my-bolt".to_string(), registry(), transfer, noop_logic()).unwrap();

        let mut seen = Vec::new();
        consumer
            .consume(|(_worker, tuple), _, _| seen.push(tuple))
            .await
            .unwrap();

        cancel.cancel();
        let _ = drain_handle.await;

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source_task_id, 7);
        assert_eq!(seen[0].source_stream_id, SYSTEM_STREAM);
        assert_eq!(seen[0].fields.get("startup"), Some(&"startup".into()));
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_yields_no_targets() {
        let (producer, _consumer, _watermarks) = new_queue::<(String, Tuple)>(8, 0.8, 0.2);
        let mut resolver_map = HashMap::new();
        resolver_map.insert(1i64, "w1".to_string());
        struct R(HashMap<TaskId, String>);
        impl executor_transfer::WorkerAddressResolver for R {
            fn worker_of(&self, task_id: TaskId) -> Option<String> {
                self.0.get(&task_id).cloned()
            }
        }
        let (transfer, _drain) = executor_transfer::new(Arc::new(R(resolver_map)), producer);
        let mut task = Task::new(1, "my-bolt".to_string(), registry(), transfer, noop_logic()).unwrap();

        let targets = task.emit("default", Values::new(vec![]), None).unwrap();
        assert!(targets.is_empty());
    }
}
