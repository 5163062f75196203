// SPDX-License-Identifier: Apache-2.0

//! Bolt specialization of the event loop (`spec.md` §4.8).

use executor_model::{METRICS_TICK_STREAM, TICK_STREAM, TaskId, Tuple};

use crate::core::{ExecutorCore, TupleActionFuture};
use crate::error::Error;

/// Wraps [`ExecutorCore`] with the bolt `tuple_action`: every tuple,
/// including `__tick`, is delivered to the user's `execute` as an
/// ordinary tuple. Bolts ACK or FAIL explicitly from within `execute`;
/// the core never auto-acks on their behalf.
pub struct BoltExecutor {
    core: ExecutorCore,
}

impl BoltExecutor {
    #[must_use]
    pub fn new(core: ExecutorCore) -> Self {
        BoltExecutor { core }
    }

    #[must_use]
    pub fn core(&self) -> &ExecutorCore {
        &self.core
    }

    /// Drains and dispatches exactly one batch from `receive_queue`.
    ///
    /// # Errors
    ///
    /// Propagates queue, registry, and transfer errors, plus whatever a
    /// user bolt's `execute` call returns.
    pub async fn drive_one_batch(&mut self) -> Result<(), Error> {
        self.core
            .drive_one_batch(|tasks, task_id, tuple| dispatch_to_bolt(tasks, task_id, tuple))
            .await
    }
}

fn dispatch_to_bolt<'a>(
    core: &'a mut ExecutorCore,
    task_id: TaskId,
    tuple: Tuple,
) -> TupleActionFuture<'a> {
    Box::pin(async move {
        // `__metrics_tick` never reaches the user: it is collected and
        // re-emitted by the core itself (`spec.md` §4.7/§4.8).
        if tuple.source_stream_id == METRICS_TICK_STREAM {
            return core.metrics_tick(task_id, &tuple);
        }
        if tuple.source_stream_id == TICK_STREAM {
            if let Some(task) = core.task_mut(task_id) {
                task.record_tick();
            }
        }
        let task = core.task_mut(task_id).ok_or_else(|| Error::Fatal {
            message: format!("bolt dispatch: unknown task {task_id}"),
        })?;
        let bolt = task.logic_mut().as_bolt_mut().ok_or_else(|| Error::Fatal {
            message: format!("task {task_id} is not a bolt"),
        })?;
        // `__tick` arrives on its own stream id but is otherwise delivered
        // to `execute` exactly like any other tuple; telling it apart is
        // left to the bolt's own logic.
        bolt.execute(&tuple).await
    })
}
