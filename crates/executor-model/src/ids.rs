// SPDX-License-Identifier: Apache-2.0

//! Task, component, and executor identity.

use std::fmt;

/// Numeric identifier of a single task. Real tasks are non-negative; negative
/// values are reserved for synthetic sources (see [`crate::SYSTEM_TASK_ID`]).
pub type TaskId = i64;

/// A named stream within a component's declared outputs.
pub type StreamId = String;

/// A named component in the topology (spout or bolt).
pub type ComponentId = String;

/// Whether a component is a data source (spout) or a transformer (bolt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// A source component with no inbound data tuples from other components.
    Spout,
    /// A transforming component with inbound data tuples and `execute` semantics.
    Bolt,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::Spout => write!(f, "spout"),
            ComponentType::Bolt => write!(f, "bolt"),
        }
    }
}

/// The identity of one executor: an inclusive range of task ids that share a
/// component id and component type. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorId {
    first: TaskId,
    last: TaskId,
    component_id: ComponentId,
    component_type: ComponentType,
}

impl ExecutorId {
    /// Builds a new executor identity from an inclusive task id range.
    ///
    /// # Panics
    ///
    /// Panics if `last < first`; an executor always owns at least one task.
    #[must_use]
    pub fn new(first: TaskId, last: TaskId, component_id: ComponentId, component_type: ComponentType) -> Self {
        assert!(last >= first, "executor task id range must be non-empty");
        ExecutorId {
            first,
            last,
            component_id,
            component_type,
        }
    }

    /// The first task id owned by this executor.
    #[must_use]
    pub fn first(&self) -> TaskId {
        self.first
    }

    /// The last task id owned by this executor.
    #[must_use]
    pub fn last(&self) -> TaskId {
        self.last
    }

    /// The component id shared by every task in this executor.
    #[must_use]
    pub fn component_id(&self) -> &ComponentId {
        &self.component_id
    }

    /// The component type shared by every task in this executor.
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// The number of tasks owned by this executor.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    /// Always `false`: an executor owns at least one task.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Expands an executor identity into its ascending list of task ids.
///
/// `taskIds = expand(executor_id)` from the data model: immutable after
/// construction, always non-empty, always ascending.
#[must_use]
pub fn expand_task_ids(executor_id: &ExecutorId) -> Vec<TaskId> {
    (executor_id.first..=executor_id.last).collect()
}
