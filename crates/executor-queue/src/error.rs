// SPDX-License-Identifier: Apache-2.0

//! Errors for queue publish/consume.

/// Errors that can occur publishing to or consuming from a queue.
#[derive(thiserror::Error, Debug)]
pub enum QueueError {
    /// The queue's consumer (for publish) or every producer (for consume)
    /// has been dropped, or shutdown interrupted a blocked call.
    #[error("queue is closed")]
    Closed,
}
