// SPDX-License-Identifier: Apache-2.0

//! The spout/bolt user-logic capability sets and the sum type the event
//! handler dispatches on (Design Notes §9: "sum type `ComponentLogic =
//! Spout(...) | Bolt(...)`, with the event-handler dispatching on the
//! tag").
//!
//! `?Send`, matching the teacher's own `local::Processor` trait: user
//! logic runs entirely on the event-handler thread's single-threaded
//! runtime and is never required to cross a thread boundary.

use async_trait::async_trait;
use executor_model::{TaskId, Tuple, Values};

use crate::error::Error;

/// The bolt capability set: `open/prepare`, `execute`, `close`. Bolts are
/// expected to ACK or FAIL explicitly; the core never auto-acks.
#[async_trait(?Send)]
pub trait Bolt {
    /// Called once before the first tuple is delivered.
    async fn prepare(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Processes one inbound tuple, including tick tuples (delivered as
    /// ordinary tuples per `spec.md` §4.8).
    async fn execute(&mut self, tuple: &Tuple) -> Result<(), Error>;

    /// Called once during shutdown.
    async fn close(&mut self) {}
}

/// The spout capability set: `open`, `next_tuple`, `ack`, `fail`, `close`.
#[async_trait(?Send)]
pub trait Spout {
    /// Called once before the event loop starts servicing it.
    async fn open(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Emits at most one unit of work: a stream and its field values, or
    /// `None` if there is nothing to emit right now.
    async fn next_tuple(&mut self) -> Result<Option<(String, Values)>, Error>;

    /// Acknowledges successful downstream processing of `message_id`.
    async fn ack(&mut self, message_id: u64) -> Result<(), Error> {
        let _ = message_id;
        Ok(())
    }

    /// Reports failed downstream processing of `message_id`.
    async fn fail(&mut self, message_id: u64) -> Result<(), Error> {
        let _ = message_id;
        Ok(())
    }

    /// Called once during shutdown.
    async fn close(&mut self) {}
}

/// The sum type an executor dispatches user-logic calls through.
pub enum ComponentLogic {
    Spout(Box<dyn Spout>),
    Bolt(Box<dyn Bolt>),
}

impl ComponentLogic {
    #[must_use]
    pub fn as_bolt_mut(&mut self) -> Option<&mut dyn Bolt> {
        match self {
            ComponentLogic::Bolt(bolt) => Some(bolt.as_mut()),
            ComponentLogic::Spout(_) => None,
        }
    }

    #[must_use]
    pub fn as_spout_mut(&mut self) -> Option<&mut dyn Spout> {
        match self {
            ComponentLogic::Spout(spout) => Some(spout.as_mut()),
            ComponentLogic::Bolt(_) => None,
        }
    }
}

/// An ack or fail notification routed to a spout task by task id.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PendingOutcome {
    Ack { task_id: TaskId, message_id: u64 },
    Fail { task_id: TaskId, message_id: u64 },
}
