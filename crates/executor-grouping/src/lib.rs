// SPDX-License-Identifier: Apache-2.0

//! Compiled stream groupings and the per-component grouper registry.
//!
//! A [`GrouperRegistry`] is built once, at task construction, from the
//! topology's grouping table (`stream_to_component_to_grouper`) and a
//! [`WorkerTopology`] snapshot. Lookups afterward never allocate a new
//! grouper or touch the topology again.

mod grouper;
mod registry;
mod topology;

pub use grouper::{CustomGrouper, Grouper, GrouperKind};
pub use registry::{GrouperRegistry, RegistryError, StreamGroupingTable};
pub use topology::WorkerTopology;
