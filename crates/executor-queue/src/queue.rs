// SPDX-License-Identifier: Apache-2.0

//! Producer/consumer halves of a bounded queue, built on `tokio::sync::mpsc`
//! so the channel can be handed to producers and a consumer living on
//! different OS threads (see `spec.md` §5).

use std::sync::Arc;

use crate::batch::Batch;
use crate::error::QueueError;
use crate::watermark::{WatermarkHandle, WatermarkState};

/// Creates a new bounded queue with the given capacity (in events, not
/// batches) and high/low watermark fractions of that capacity.
///
/// Returns the producer half, the consumer half, and a [`WatermarkHandle`]
/// that can be handed to a `BackpressureCoordinator` independently of
/// either half.
#[must_use]
pub fn new_queue<T>(
    capacity: usize,
    high_watermark: f64,
    low_watermark: f64,
) -> (QueueProducer<T>, QueueConsumer<T>, WatermarkHandle) {
    let (sender, receiver) = tokio::sync::mpsc::channel(capacity.max(1));
    let state = Arc::new(WatermarkState::new(capacity, high_watermark, low_watermark));
    let handle = WatermarkHandle {
        state: state.clone(),
    };
    (
        QueueProducer {
            sender,
            watermark: state.clone(),
        },
        QueueConsumer {
            receiver,
            watermark: state,
            sequence: 0,
        },
        handle,
    )
}

/// The producer (publish) half of a queue. `Clone`-able to support multiple
/// producers publishing into the same `receive_queue`.
pub struct QueueProducer<T> {
    sender: tokio::sync::mpsc::Sender<Batch<T>>,
    watermark: Arc<WatermarkState>,
}

impl<T> Clone for QueueProducer<T> {
    fn clone(&self) -> Self {
        QueueProducer {
            sender: self.sender.clone(),
            watermark: self.watermark.clone(),
        }
    }
}

impl<T> QueueProducer<T> {
    /// Publishes a batch, blocking (awaiting) while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the consumer has been dropped.
    pub async fn publish(&self, batch: Batch<T>) -> Result<(), QueueError> {
        let n = batch.len();
        self.sender.send(batch).await.map_err(|_| QueueError::Closed)?;
        self.watermark.record_publish(n);
        Ok(())
    }

    /// Current queue depth in events.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.watermark.depth()
    }
}

/// The consumer half of a queue. Single-threaded per consumer: only one
/// task should ever call [`QueueConsumer::consume`] at a time.
pub struct QueueConsumer<T> {
    receiver: tokio::sync::mpsc::Receiver<Batch<T>>,
    watermark: Arc<WatermarkState>,
    sequence: u64,
}

impl<T> QueueConsumer<T> {
    /// Waits for the next published batch and invokes `handler(event,
    /// sequence, end_of_batch)` for each event in FIFO order.
    ///
    /// `sequence` is a monotonically increasing counter across the queue's
    /// lifetime; `end_of_batch` is true for the last event in the batch
    /// that was just delivered.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once every producer has been dropped
    /// and no batches remain buffered.
    pub async fn consume<F>(&mut self, mut handler: F) -> Result<(), QueueError>
    where
        F: FnMut(T, u64, bool),
    {
        let batch = self.receiver.recv().await.ok_or(QueueError::Closed)?;
        let n = batch.len();
        let last = n.saturating_sub(1);
        for (i, event) in batch.0.into_iter().enumerate() {
            self.sequence += 1;
            handler(event, self.sequence, i == last);
        }
        self.watermark.record_consume(n);
        Ok(())
    }

    /// A handle to this queue's watermark state, for registering a
    /// `BackpressureCoordinator` without holding the consumer itself.
    #[must_use]
    pub fn watermarks(&self) -> WatermarkHandle {
        WatermarkHandle {
            state: self.watermark.clone(),
        }
    }

    /// Current queue depth in events.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.watermark.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_delivery_with_sequence_and_eob() {
        let (producer, mut consumer, _watermarks) = new_queue::<u32>(16, 0.8, 0.2);
        producer
            .publish(Batch::from_vec(vec![10, 20, 30]))
            .await
            .unwrap();

        let mut seen = Vec::new();
        consumer
            .consume(|event, seq, eob| seen.push((event, seq, eob)))
            .await
            .unwrap();

        assert_eq!(seen, vec![(10, 1, false), (20, 2, false), (30, 3, true)]);
    }

    #[tokio::test]
    async fn closed_when_every_producer_dropped() {
        let (producer, mut consumer, _watermarks) = new_queue::<u32>(4, 0.8, 0.2);
        drop(producer);
        let result = consumer.consume(|_, _, _| {}).await;
        assert!(matches!(result, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn multi_producer_preserves_each_producers_order() {
        let (producer, mut consumer, _watermarks) = new_queue::<(u8, u32)>(16, 0.8, 0.2);
        let producer2 = producer.clone();

        producer
            .publish(Batch::from_vec(vec![(0, 1), (0, 2)]))
            .await
            .unwrap();
        producer2
            .publish(Batch::from_vec(vec![(1, 1), (1, 2)]))
            .await
            .unwrap();

        let mut from0 = Vec::new();
        let mut from1 = Vec::new();
        for _ in 0..2 {
            consumer
                .consume(|(src, v), _, _| {
                    if src == 0 {
                        from0.push(v);
                    } else {
                        from1.push(v);
                    }
                })
                .await
                .unwrap();
        }
        assert_eq!(from0, vec![1, 2]);
        assert_eq!(from1, vec![1, 2]);
    }
}
