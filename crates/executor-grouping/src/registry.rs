// SPDX-License-Identifier: Apache-2.0

//! Compiles the topology's grouping table into a lookup table of ready
//! [`Grouper`]s, once, at task construction.

use std::collections::HashMap;

use executor_model::{ComponentId, StreamId, TaskId, Values};

use crate::grouper::{Grouper, GrouperError, GrouperKind, SelectContext};
use crate::topology::WorkerTopology;

/// A declarative description of one `(stream, downstream component)`
/// grouping, as carried by the topology before compilation.
pub struct StreamGroupingTable {
    /// `stream_id -> (component_id -> (kind, downstream task ids))`, or
    /// `None` for a declared stream with no downstream subscribers.
    entries: HashMap<StreamId, Option<Vec<(ComponentId, GrouperKind, Vec<TaskId>)>>>,
}

impl StreamGroupingTable {
    #[must_use]
    pub fn new() -> Self {
        StreamGroupingTable {
            entries: HashMap::new(),
        }
    }

    /// Declares a stream with no downstream subscribers.
    pub fn declare_unsubscribed(&mut self, stream_id: impl Into<StreamId>) {
        self.entries.insert(stream_id.into(), None);
    }

    /// Adds a downstream component subscription for a stream, in
    /// declaration order.
    pub fn subscribe(
        &mut self,
        stream_id: impl Into<StreamId>,
        component_id: impl Into<ComponentId>,
        kind: GrouperKind,
        downstream_tasks: Vec<TaskId>,
    ) {
        self.entries
            .entry(stream_id.into())
            .or_insert_with(|| Some(Vec::new()))
            .get_or_insert_with(Vec::new)
            .push((component_id.into(), kind, downstream_tasks));
    }
}

impl Default for StreamGroupingTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors building or using a [`GrouperRegistry`].
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("stream {0:?} was never declared in the grouping table")]
    UnknownStream(StreamId),
    #[error(transparent)]
    Grouper(#[from] GrouperError),
}

/// A compiled, per-component-subscription grouper table for one executor's
/// outgoing streams. Built once from a [`StreamGroupingTable`] snapshot;
/// lookups afterward never touch the topology again.
pub struct GrouperRegistry {
    // `None` records a declared stream with no subscribers (short-circuits
    // emission); `Some` is never empty.
    streams: HashMap<StreamId, Option<Vec<(ComponentId, Grouper)>>>,
    topology: WorkerTopology,
    this_worker: String,
}

impl GrouperRegistry {
    /// Compiles a grouper for every declared `(stream, component)` pair in
    /// `table`.
    #[must_use]
    pub fn build(table: StreamGroupingTable, topology: WorkerTopology) -> Self {
        let this_worker = topology.this_worker().to_owned();
        let streams = table
            .entries
            .into_iter()
            .map(|(stream_id, subs)| {
                let compiled = subs.map(|subs| {
                    subs.into_iter()
                        .map(|(component_id, kind, downstream)| {
                            (component_id, Grouper::new(kind, downstream))
                        })
                        .collect::<Vec<_>>()
                });
                (stream_id, compiled)
            })
            .collect();
        GrouperRegistry {
            streams,
            topology,
            this_worker,
        }
    }

    /// Selects outgoing task ids for `(stream, values)`, flattening every
    /// subscribing component's selection in component-declaration order.
    ///
    /// Returns an empty list, with no error, for a stream with no
    /// subscribers — per the invariant that empty downstream sets
    /// short-circuit at the registry `null` entry rather than at the
    /// grouper.
    pub fn outgoing_tasks(
        &self,
        stream_id: &str,
        values: &Values,
        direct_dest: Option<TaskId>,
        load: Option<&dyn Fn(TaskId) -> f64>,
    ) -> Result<Vec<TaskId>, RegistryError> {
        let Some(subs) = self
            .streams
            .get(stream_id)
            .ok_or_else(|| RegistryError::UnknownStream(stream_id.to_owned()))?
        else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for (_component_id, grouper) in subs {
            let ctx = SelectContext {
                values,
                direct_dest,
                source_worker: &self.this_worker,
                topology: &self.topology,
                load,
            };
            out.extend(grouper.select(&ctx)?);
        }
        Ok(out)
    }

    /// True if `stream_id` was declared with no downstream subscribers.
    #[must_use]
    pub fn has_no_subscribers(&self, stream_id: &str) -> bool {
        matches!(self.streams.get(stream_id), Some(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_model::ComponentType;

    fn topology() -> WorkerTopology {
        let mut task_component = HashMap::new();
        let mut task_worker = HashMap::new();
        for t in [10, 11, 12, 13] {
            task_component.insert(t, "downstream-bolt".to_string());
            task_worker.insert(t, "w1".to_string());
        }
        let _ = ComponentType::Bolt;
        WorkerTopology::new(task_component, task_worker, "w1".to_string())
    }

    #[test]
    fn null_entry_short_circuits_to_empty() {
        let mut table = StreamGroupingTable::new();
        table.declare_unsubscribed("default");
        let registry = GrouperRegistry::build(table, topology());

        let values = Values::new(vec![]);
        let out = registry
            .outgoing_tasks("default", &values, None, None)
            .unwrap();
        assert!(out.is_empty());
        assert!(registry.has_no_subscribers("default"));
    }

    #[test]
    fn flattens_multiple_subscribers_in_declaration_order() {
        let mut table = StreamGroupingTable::new();
        table.subscribe("default", "bolt-a", GrouperKind::All, vec![10, 11]);
        table.subscribe("default", "bolt-b", GrouperKind::Global, vec![20, 21]);
        let registry = GrouperRegistry::build(table, topology());

        let values = Values::new(vec![]);
        let out = registry
            .outgoing_tasks("default", &values, None, None)
            .unwrap();
        assert_eq!(out, vec![10, 11, 20]);
    }

    #[test]
    fn unknown_stream_is_an_error() {
        let table = StreamGroupingTable::new();
        let registry = GrouperRegistry::build(table, topology());
        let values = Values::new(vec![]);
        assert!(matches!(
            registry.outgoing_tasks("nope", &values, None, None),
            Err(RegistryError::UnknownStream(_))
        ));
    }
}
