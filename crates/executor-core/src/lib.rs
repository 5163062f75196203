// SPDX-License-Identifier: Apache-2.0

//! Executor lifecycle, event-loop driver, tick scheduling, backpressure
//! coordination, and spout/bolt specialization (`spec.md` §4.4-4.10).
//!
//! This crate ties `executor-model`, `executor-queue`, `executor-grouping`,
//! and `executor-transfer` together into the runnable Executor core:
//! [`ExecutorCore`] drives the shared inbound event loop and exposes the
//! ambient operations every specialization needs (`send_unanchored`,
//! `send_to_event_logger`, `metrics_tick`); [`BoltExecutor`] and
//! [`SpoutExecutor`] specialize its tuple dispatch per `spec.md` §4.8/§4.9;
//! [`Task`] binds one task id to user logic and the compiled grouper
//! registry; [`TickScheduler`] and [`BackpressureCoordinator`] are the two
//! timer/watermark collaborators wired into the inbound queue.

mod backpressure;
mod bolt;
mod config;
mod core;
mod error;
mod lifecycle;
mod logic;
mod spout;
mod task;
mod thread_host;
mod tick;

pub use backpressure::{BackpressureCoordinator, BackpressureTrigger};
pub use bolt::BoltExecutor;
pub use config::Config;
pub use core::{DebugOptions, ExecutorCore, MetricsRegistry, TupleActionFuture, WorkerHandle};
pub use error::Error;
pub use lifecycle::{Executor, ExecutorKind, RunningExecutor, TickPlan};
pub use logic::{Bolt, ComponentLogic, Spout};
pub use spout::SpoutExecutor;
pub use task::{Task, TaskStats};
pub use thread_host::{ThreadHandle, spawn};
pub use tick::{TickScheduler, is_system_component};
