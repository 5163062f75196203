// SPDX-License-Identifier: Apache-2.0

//! Core data model shared by every crate in the executor workspace: task and
//! component identifiers, tuples, and the handful of reserved streams the
//! core itself publishes on.

mod ids;
mod metrics;
mod reserved;
mod tuple;

pub use ids::{ComponentId, ComponentType, ExecutorId, StreamId, TaskId, expand_task_ids};
pub use metrics::{DataPoint, TaskInfo};
pub use reserved::{
    ACK_STREAM, EVENTLOGGER_STREAM, FAIL_STREAM, METRICS_STREAM, METRICS_TICK_STREAM,
    SYSTEM_STREAM, SYSTEM_TASK_ID, TICK_STREAM,
};
pub use tuple::{AddressedTuple, Destination, Tuple, Values};
