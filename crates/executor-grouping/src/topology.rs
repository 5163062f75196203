// SPDX-License-Identifier: Apache-2.0

//! The static `task_id -> worker address` and `task_id -> component_id`
//! mapping handed down by the worker, used by `Direct` and
//! `Local-or-shuffle` groupings and by `executor-transfer` for destination
//! resolution.

use std::collections::HashMap;

use executor_model::{ComponentId, TaskId};

/// A read-only snapshot of where every task in the topology lives.
#[derive(Debug, Clone, Default)]
pub struct WorkerTopology {
    task_component: HashMap<TaskId, ComponentId>,
    task_worker: HashMap<TaskId, String>,
    this_worker: String,
}

impl WorkerTopology {
    /// Builds a topology snapshot. `this_worker` is the address (e.g.
    /// `"host:port"`) of the worker process this executor runs in, used to
    /// decide `Local-or-shuffle` locality.
    #[must_use]
    pub fn new(
        task_component: HashMap<TaskId, ComponentId>,
        task_worker: HashMap<TaskId, String>,
        this_worker: String,
    ) -> Self {
        WorkerTopology {
            task_component,
            task_worker,
            this_worker,
        }
    }

    /// The component id hosting `task_id`, if known.
    #[must_use]
    pub fn component_of(&self, task_id: TaskId) -> Option<&ComponentId> {
        self.task_component.get(&task_id)
    }

    /// The worker address hosting `task_id`, if known.
    #[must_use]
    pub fn worker_of(&self, task_id: TaskId) -> Option<&str> {
        self.task_worker.get(&task_id).map(String::as_str)
    }

    /// True if `task_id` runs in this worker process.
    #[must_use]
    pub fn is_local(&self, task_id: TaskId) -> bool {
        self.worker_of(task_id)
            .is_some_and(|w| w == self.this_worker)
    }

    /// This worker's own address.
    #[must_use]
    pub fn this_worker(&self) -> &str {
        &self.this_worker
    }
}
