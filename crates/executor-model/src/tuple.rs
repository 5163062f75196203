// SPDX-License-Identifier: Apache-2.0

//! Tuples and addressed tuples, the unit of data flowing through an executor.

use crate::ids::{StreamId, TaskId};
use serde_json::Value;

/// An ordered, named set of field values carried by a [`Tuple`].
///
/// Field order is preserved for positional access; named access (used by
/// fields grouping) does a linear scan, which is fine at the small field
/// counts tuples carry in practice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    fields: Vec<(String, Value)>,
}

impl Values {
    /// Builds a `Values` from an ordered list of `(name, value)` pairs.
    #[must_use]
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Values { fields }
    }

    /// A `Values` with a single field, useful for tick tuples and simple
    /// system notices.
    #[must_use]
    pub fn single(name: &str, value: Value) -> Self {
        Values {
            fields: vec![(name.to_owned(), value)],
        }
    }

    /// Looks up a field's value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the declared field names, in order.
    #[must_use]
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Returns all field values, in declaration order.
    #[must_use]
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if this tuple has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A typed record flowing between tasks on a named stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    /// The task that produced this tuple.
    pub source_task_id: TaskId,
    /// The stream this tuple was emitted on.
    pub source_stream_id: StreamId,
    /// The tuple's field values.
    pub fields: Values,
    /// Optional message id, present when the tuple anchors an at-least-once
    /// tracking chain upstream of this core.
    pub message_id: Option<u64>,
}

impl Tuple {
    /// Builds a new tuple stamped with its source and stream.
    #[must_use]
    pub fn new(
        source_task_id: TaskId,
        source_stream_id: impl Into<StreamId>,
        fields: Values,
        message_id: Option<u64>,
    ) -> Self {
        Tuple {
            source_task_id,
            source_stream_id: source_stream_id.into(),
            fields,
            message_id,
        }
    }
}

/// Where an [`AddressedTuple`] should be delivered within one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Deliver to a single task.
    Task(TaskId),
    /// Deliver to every task id owned by this executor.
    Broadcast,
}

/// A tuple plus its intra-executor destination, the unit carried by the
/// inbound receive queue.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressedTuple {
    /// Where this tuple should be delivered.
    pub dest: Destination,
    /// The tuple itself.
    pub tuple: Tuple,
}

impl AddressedTuple {
    /// Builds a new addressed tuple.
    #[must_use]
    pub fn new(dest: Destination, tuple: Tuple) -> Self {
        AddressedTuple { dest, tuple }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_lookup_by_name() {
        let values = Values::new(vec![
            ("user".to_owned(), Value::String("alice".to_owned())),
            ("amount".to_owned(), Value::from(42)),
        ]);
        assert_eq!(values.get("user"), Some(&Value::String("alice".to_owned())));
        assert_eq!(values.get("amount"), Some(&Value::from(42)));
        assert_eq!(values.get("missing"), None);
    }

    #[test]
    fn single_field_helper() {
        let values = Values::single("freq", Value::from(30));
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("freq"), Some(&Value::from(30)));
    }
}
