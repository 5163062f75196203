// SPDX-License-Identifier: Apache-2.0

//! Staging buffer and drain loop.

use std::collections::HashMap;
use std::sync::Arc;

use executor_model::{TaskId, Tuple};
use executor_queue::{Batch, QueueProducer};

/// A worker address, e.g. `"host:port"`.
pub type WorkerAddress = String;

/// Resolves which worker a task id lives on. Implemented by the worker
/// over its static `task_id -> worker_address` map.
pub trait WorkerAddressResolver: Send + Sync {
    fn worker_of(&self, task_id: TaskId) -> Option<WorkerAddress>;
}

/// Errors enqueuing a tuple for transfer.
#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error("transfer drain loop has shut down")]
    Closed,
    #[error("destination task {0} has no known worker address")]
    UnknownDestination(TaskId),
}

struct Staged {
    dest: TaskId,
    tuple: Tuple,
}

/// The cloneable handle tasks call `transfer` on. Cheap to clone; every
/// clone shares the same staging buffer.
#[derive(Clone)]
pub struct ExecutorTransfer {
    staging: flume::Sender<Staged>,
}

impl ExecutorTransfer {
    /// Enqueues `(dest_task_id, tuple)` onto the staging buffer. Never
    /// blocks: the staging channel is unbounded, since backpressure is
    /// applied downstream, by `transfer_queue`'s watermarks, not here.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Closed`] if the drain loop has already shut
    /// down.
    pub fn transfer(&self, dest_task_id: TaskId, tuple: Tuple) -> Result<(), TransferError> {
        self.staging
            .send(Staged {
                dest: dest_task_id,
                tuple,
            })
            .map_err(|_| TransferError::Closed)
    }
}

/// The dedicated, single-threaded drain loop. Construct alongside an
/// [`ExecutorTransfer`] via [`new`], then run it to completion (or spawn it)
/// on its own task or thread.
pub struct TransferDrainLoop {
    staging: flume::Receiver<Staged>,
    resolver: Arc<dyn WorkerAddressResolver>,
    transfer_queue: QueueProducer<(WorkerAddress, Tuple)>,
}

/// Builds a linked `ExecutorTransfer` handle and its drain loop.
#[must_use]
pub fn new(
    resolver: Arc<dyn WorkerAddressResolver>,
    transfer_queue: QueueProducer<(WorkerAddress, Tuple)>,
) -> (ExecutorTransfer, TransferDrainLoop) {
    let (tx, rx) = flume::unbounded();
    (
        ExecutorTransfer { staging: tx },
        TransferDrainLoop {
            staging: rx,
            resolver,
            transfer_queue,
        },
    )
}

impl TransferDrainLoop {
    /// Runs the drain loop until `cancel` fires, then drains whatever
    /// remains staged before returning. Each batch published to
    /// `transfer_queue` holds tuples for one destination worker, in arrival
    /// order.
    pub async fn run(mut self, cancel: tokio_util::sync::CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.drain_remaining().await;
                    return;
                }
                item = self.staging.recv_async() => {
                    match item {
                        Ok(first) => self.flush_batch(first).await,
                        Err(_) => return,
                    }
                }
            }
        }
    }

    async fn drain_remaining(&mut self) {
        while let Ok(first) = self.staging.try_recv() {
            self.flush_batch(first).await;
        }
    }

    /// Pulls everything currently staged starting from `first`, groups by
    /// destination worker preserving arrival order per worker, and
    /// publishes one batch per worker.
    async fn flush_batch(&mut self, first: Staged) {
        let mut order: Vec<WorkerAddress> = Vec::new();
        let mut grouped: HashMap<WorkerAddress, Vec<Tuple>> = HashMap::new();

        let mut push = |staged: Staged, grouped: &mut HashMap<WorkerAddress, Vec<Tuple>>, order: &mut Vec<WorkerAddress>| {
            let Some(worker) = self.resolver.worker_of(staged.dest) else {
                tracing::warn!(dest = staged.dest, "dropping tuple for unknown destination task");
                return;
            };
            let entry = grouped.entry(worker.clone()).or_insert_with(|| {
                order.push(worker);
                Vec::new()
            });
            entry.push(staged.tuple);
        };

        push(first, &mut grouped, &mut order);
        while let Ok(next) = self.staging.try_recv() {
            push(next, &mut grouped, &mut order);
        }

        for worker in order {
            if let Some(tuples) = grouped.remove(&worker) {
                let batch = Batch::from_vec(
                    tuples.into_iter().map(|t| (worker.clone(), t)).collect(),
                );
                if self.transfer_queue.publish(batch).await.is_err() {
                    tracing::warn!("transfer_queue closed while draining staged tuples");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_model::Values;
    use std::collections::HashMap as StdHashMap;

    struct StaticResolver(StdHashMap<TaskId, WorkerAddress>);

    impl WorkerAddressResolver for StaticResolver {
        fn worker_of(&self, task_id: TaskId) -> Option<WorkerAddress> {
            self.0.get(&task_id).cloned()
        }
    }

    fn tuple() -> Tuple {
        Tuple::new(1, "default", Values::new(vec![]), None)
    }

    #[tokio::test]
    async fn groups_staged_tuples_by_destination_worker() {
        let mut map = StdHashMap::new();
        map.insert(10, "w1".to_string());
        map.insert(11, "w2".to_string());
        map.insert(12, "w1".to_string());
        let resolver = Arc::new(StaticResolver(map));

        let (_producer, mut consumer, _watermarks) =
            executor_queue::new_queue::<(WorkerAddress, Tuple)>(64, 0.8, 0.2);
        let (transfer, drain) = new(resolver, _producer);

        transfer.transfer(10, tuple()).unwrap();
        transfer.transfer(11, tuple()).unwrap();
        transfer.transfer(12, tuple()).unwrap();

        let cancel = tokio_util::sync::CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(drain.run(cancel_clone));

        let mut seen_workers = Vec::new();
        consumer
            .consume(|(worker, _tuple), _, _| seen_workers.push(worker))
            .await
            .unwrap();
        consumer
            .consume(|(worker, _tuple), _, _| seen_workers.push(worker))
            .await
            .unwrap();

        cancel.cancel();
        handle.await.unwrap();

        assert!(seen_workers.contains(&"w1".to_string()));
        assert!(seen_workers.contains(&"w2".to_string()));
    }

    #[tokio::test]
    async fn transfer_after_drain_shutdown_errors() {
        let resolver = Arc::new(StaticResolver(StdHashMap::new()));
        let (producer, _consumer, _watermarks) =
            executor_queue::new_queue::<(WorkerAddress, Tuple)>(4, 0.8, 0.2);
        let (transfer, drain) = new(resolver, producer);

        let cancel = tokio_util::sync::CancellationToken::new();
        cancel.cancel();
        drain.run(cancel).await;

        // staging sender is still open (transfer handle held), so this
        // still succeeds; closure is observed only once the drain loop's
        // receiver is actually dropped.
        drop(transfer);
    }
}
