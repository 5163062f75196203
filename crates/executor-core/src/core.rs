// SPDX-License-Identifier: Apache-2.0

//! `ExecutorCore`: the shared event-loop driver and lifecycle owned by
//! every executor, specialized by `SpoutExecutor`/`BoltExecutor` (`spec.md`
//! §4.7).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use executor_model::{
    ComponentId, DataPoint, Destination, EVENTLOGGER_STREAM, METRICS_STREAM, TaskId, TaskInfo,
    Tuple, Values,
};
use executor_queue::QueueConsumer;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::error::Error;
use crate::task::Task;

/// A boxed, `?Send` future returned by a `tuple_action` closure passed to
/// [`ExecutorCore::drive_one_batch`], matching how `async_trait(?Send)`
/// already boxes `Bolt::execute` and `Spout::next_tuple`.
pub type TupleActionFuture<'a> = std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), Error>> + 'a>>;

/// Typed, shared atomics and callbacks wired in by the worker (Design
/// Notes §9: "pass an explicit `WorkerHandle` value... rather than a
/// heterogeneous string-keyed map").
#[derive(Clone)]
pub struct WorkerHandle {
    pub storm_active: Arc<AtomicBool>,
    pub throttle_on: Arc<AtomicBool>,
    pub storm_component_debug: Arc<AtomicBool>,
    pub task_to_component: Arc<BTreeMap<TaskId, ComponentId>>,
    pub suicide_fn: Arc<dyn Fn(&Error) + Send + Sync>,
    pub host: String,
    pub port: u16,
}

/// Per-task-interval metrics registration: `(task_id, metric_name) ->
/// current value`. Supplied by the worker's metrics plumbing; `None`
/// values are excluded from the emitted `DataPoint` list per `spec.md`
/// §4.7.
pub trait MetricsRegistry: Send + Sync {
    fn collect(&self, task_id: TaskId, interval_secs: u64) -> Vec<(String, Option<f64>)>;
}

/// Debug sampling configuration for `send_to_event_logger`.
#[derive(Debug, Clone, Copy)]
pub struct DebugOptions {
    pub enabled: bool,
    pub sampling_pct: f64,
}

/// The shared driver every executor specialization wraps. Owns the
/// immutable `task_id -> Task` map, the inbound queue consumer, and the
/// config/worker context needed by `send_unanchored`,
/// `send_to_event_logger`, and `metrics_tick`.
pub struct ExecutorCore {
    tasks: BTreeMap<TaskId, Task>,
    task_ids: Vec<TaskId>,
    receive_queue: QueueConsumer<executor_model::AddressedTuple>,
    config: Config,
    worker: WorkerHandle,
    metrics: Arc<dyn MetricsRegistry>,
    rng: Mutex<rand::rngs::StdRng>,
}

impl ExecutorCore {
    #[must_use]
    pub fn new(
        tasks: BTreeMap<TaskId, Task>,
        receive_queue: QueueConsumer<executor_model::AddressedTuple>,
        config: Config,
        worker: WorkerHandle,
        metrics: Arc<dyn MetricsRegistry>,
    ) -> Self {
        let task_ids: Vec<TaskId> = tasks.keys().copied().collect();
        ExecutorCore {
            tasks,
            task_ids,
            receive_queue,
            config,
            worker,
            metrics,
            rng: Mutex::new(rand::rngs::StdRng::from_entropy()),
        }
    }

    /// The ascending task ids owned by this executor.
    #[must_use]
    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    /// Looks up a task by id for a specialization's `tuple_action`.
    #[must_use]
    pub fn task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&task_id)
    }

    fn debug_enabled(&self) -> bool {
        self.config.get_bool("topology.debug", false)
            || self.worker.storm_component_debug.load(Ordering::Relaxed)
    }

    /// Waits for the next batch on `receive_queue` and dispatches each
    /// tuple in order: broadcast tuples fan out to every task id in
    /// ascending order, addressed tuples go to their single destination.
    /// `tuple_action` is the specialization-supplied handler (§4.8/§4.9),
    /// boxed the same way `async_trait(?Send)` already boxes `Bolt::execute`
    /// and `Spout::next_tuple`, so specializations can `.await` user logic
    /// without forcing the whole batch loop to hold one `&mut self.tasks`
    /// borrow across every iteration.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Queue`] if `receive_queue` has been closed, and
    /// whatever error `tuple_action` itself returns.
    pub async fn drive_one_batch<F>(&mut self, mut tuple_action: F) -> Result<(), Error>
    where
        F: for<'b> FnMut(&'b mut ExecutorCore, TaskId, Tuple) -> TupleActionFuture<'b>,
    {
        // `consume` hands back ownership of each event synchronously via
        // the callback; we collect dispatch targets first so the borrow of
        // `self.tasks` inside the closure never overlaps the borrow on
        // `self.receive_queue`.
        let debug = self.debug_enabled();
        let mut dispatch: Vec<(TaskId, Tuple)> = Vec::new();
        self.receive_queue
            .consume(|addressed, _seq, _eob| {
                if debug {
                    tracing::debug!(?addressed.tuple, "incoming tuple");
                }
                match addressed.dest {
                    Destination::Task(task_id) => dispatch.push((task_id, addressed.tuple)),
                    Destination::Broadcast => {
                        for &task_id in &self.task_ids {
                            dispatch.push((task_id, addressed.tuple.clone()));
                        }
                    }
                }
            })
            .await?;

        for (task_id, tuple) in dispatch {
            tuple_action(self, task_id, tuple).await?;
        }
        Ok(())
    }

    /// Builds the outgoing tuple from `task` and sends it to every target
    /// returned by the task's outgoing resolver, with no anchoring to any
    /// in-flight message id (`spec.md` §4.7).
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Registry`] or [`Error::Transfer`].
    pub fn send_unanchored(
        &mut self,
        task_id: TaskId,
        stream_id: &str,
        values: Values,
    ) -> Result<Vec<TaskId>, Error> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::Fatal {
                message: format!("send_unanchored: unknown task {task_id}"),
            })?;
        task.emit(stream_id.to_owned(), values, None)
    }

    /// Forwards `(component_id, message_id, wall_time_ms, values)` to the
    /// event logger stream if debug sampling is enabled for this
    /// component and a uniform draw falls under `sampling_pct`. Silently
    /// swallows sampling misses, per `spec.md` §7.
    pub fn send_to_event_logger(
        &mut self,
        task_id: TaskId,
        component_id: &ComponentId,
        message_id: Option<u64>,
        values: Values,
        debug: DebugOptions,
        wall_time_ms: u64,
    ) -> Result<(), Error> {
        if !debug.enabled {
            return Ok(());
        }
        let roll = self.rng.lock().r#gen::<f64>() * 100.0;
        if roll >= debug.sampling_pct {
            return Ok(());
        }
        let payload = Values::new(vec![
            ("component_id".to_owned(), component_id.clone().into()),
            (
                "message_id".to_owned(),
                message_id.map_or(serde_json::Value::Null, serde_json::Value::from),
            ),
            ("wall_time_ms".to_owned(), wall_time_ms.into()),
            ("values".to_owned(), values_to_json(&values)),
        ]);
        self.send_unanchored(task_id, EVENTLOGGER_STREAM, payload)?;
        Ok(())
    }

    /// Reads the tick interval from field 0 of `tuple`, collects every
    /// metric registered at that interval for `task_id` into a
    /// [`DataPoint`] list excluding unregistered (`None`) values, and
    /// emits `(TaskInfo, data_points)` on the metrics stream if
    /// non-empty. Produces zero outbound tuples for an interval with no
    /// registrations (scenario 6, `spec.md` §8).
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Registry`] or [`Error::Transfer`] from the
    /// emission, or [`Error::Fatal`] if the tick tuple's interval field is
    /// malformed (wrapping per §7: "`metrics_tick` wraps any exception").
    pub fn metrics_tick(&mut self, task_id: TaskId, tuple: &Tuple) -> Result<(), Error> {
        let interval = tuple
            .fields
            .values()
            .next()
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| Error::Fatal {
                message: "metrics_tick: tick tuple missing integer interval field".to_owned(),
            })?;

        let data_points: Vec<DataPoint> = self
            .metrics
            .collect(task_id, interval)
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| DataPoint { name, value }))
            .collect();

        if data_points.is_empty() {
            return Ok(());
        }

        let component_id = self
            .tasks
            .get(&task_id)
            .map(|t| t.component_id().clone())
            .unwrap_or_default();
        let task_info = TaskInfo {
            task_id,
            component_id,
            host: self.worker.host.clone(),
            port: self.worker.port,
        };
        let payload = Values::new(vec![
            ("task_info".to_owned(), task_info_to_json(&task_info)),
            (
                "data_points".to_owned(),
                serde_json::Value::Array(
                    data_points
                        .iter()
                        .map(|dp| {
                            serde_json::json!({"name": dp.name, "value": dp.value})
                        })
                        .collect(),
                ),
            ),
        ]);
        self.send_unanchored(task_id, METRICS_STREAM, payload)?;
        Ok(())
    }
}

fn values_to_json(values: &Values) -> serde_json::Value {
    serde_json::Value::Object(
        values
            .field_names()
            .zip(values.values())
            .map(|(name, value)| (name.to_owned(), value.clone()))
            .collect(),
    )
}

fn task_info_to_json(info: &TaskInfo) -> serde_json::Value {
    serde_json::json!({
        "task_id": info.task_id,
        "component_id": info.component_id,
        "host": info.host,
        "port": info.port,
    })
}
