// SPDX-License-Identifier: Apache-2.0

//! Bounded queues used for the executor's `receive_queue` and
//! `transfer_queue`: `tokio::sync::mpsc` underneath (so the channel can
//! cross the real OS thread boundaries described in `spec.md` §5), with an
//! explicit, edge-triggered watermark state layered on top so backpressure
//! notifications fire exactly on crossing, never on level.

mod batch;
mod error;
mod queue;
mod watermark;

pub use batch::Batch;
pub use error::QueueError;
pub use queue::{QueueConsumer, QueueProducer, new_queue};
pub use watermark::{WatermarkHandle, WatermarkObserver};
