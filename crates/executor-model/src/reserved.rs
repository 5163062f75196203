// SPDX-License-Identifier: Apache-2.0

//! Reserved stream ids and the synthetic system task id.

use crate::TaskId;

/// System tick stream: one integer field, the tick interval in seconds.
pub const TICK_STREAM: &str = "__tick";

/// Metrics tick stream: one integer field, the metrics interval in seconds.
pub const METRICS_TICK_STREAM: &str = "__metrics_tick";

/// Stream on which collected `(TaskInfo, Vec<DataPoint>)` pairs are emitted.
pub const METRICS_STREAM: &str = "__metrics";

/// Stream used for the task startup notice and other system-originated
/// notices.
pub const SYSTEM_STREAM: &str = "__system";

/// Stream sampled tuples are forwarded to for event logging.
pub const EVENTLOGGER_STREAM: &str = "__eventlogger";

/// Inbound stream a spout task receives ACK notifications on, one integer
/// field holding the acked message id. Delivered by the (out-of-scope)
/// ack-tracking collaborator, not produced anywhere in this crate.
pub const ACK_STREAM: &str = "__ack_ack";

/// Inbound stream a spout task receives FAIL notifications on, one integer
/// field holding the failed message id. Delivered by the (out-of-scope)
/// ack-tracking collaborator, not produced anywhere in this crate.
pub const FAIL_STREAM: &str = "__ack_fail";

/// Synthetic source task id for system-originated tuples (ticks, startup
/// notices). Never a valid member of any executor's task id range, since
/// real task ids are non-negative.
pub const SYSTEM_TASK_ID: TaskId = -1;
