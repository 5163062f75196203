// SPDX-License-Identifier: Apache-2.0

//! The executor's error sum type, replacing the exception control flow
//! named in Design Notes §9 with `Result<T, Error>`.

use thiserror::Error;

/// Errors raised anywhere inside an executor's lifecycle or event loops.
#[derive(Error, Debug)]
pub enum Error {
    /// A spout/bolt callback raised an error. Reported through the
    /// cluster-state error reporter; escalated to `Fatal` only if declared
    /// fatal or the report rate limit is exceeded.
    #[error("user logic error in component {component_id:?} task {task_id}: {source}")]
    UserLogic {
        component_id: String,
        task_id: i64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A blocked queue operation was interrupted by shutdown. Treated as
    /// normal termination, never escalated.
    #[error("queue interrupted during shutdown")]
    QueueInterrupted,

    /// Component configuration failed to parse or normalize.
    #[error("config error: {0}")]
    Config(String),

    /// The cluster state store could not be reached or reported an error.
    #[error("cluster state error: {0}")]
    ClusterState(String),

    /// Unrecoverable: the executor cannot continue and the worker must be
    /// torn down via `suicide_fn`.
    #[error("fatal executor error: {message}")]
    Fatal { message: String },

    #[error("queue error: {0}")]
    Queue(#[from] executor_queue::QueueError),

    #[error("grouper registry error: {0}")]
    Registry(#[from] executor_grouping::RegistryError),

    #[error("transfer error: {0}")]
    Transfer(#[from] executor_transfer::TransferError),

    #[error("failed to spawn executor thread {thread_name:?}: {source}")]
    ThreadSpawn {
        thread_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("executor thread {thread_name:?} panicked: {panic_message}")]
    ThreadJoinPanic {
        thread_name: String,
        panic_message: String,
    },
}

impl Error {
    /// True if this error should escalate to `suicide_fn` rather than be
    /// logged and continued past.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. } | Error::ThreadJoinPanic { .. })
    }
}
