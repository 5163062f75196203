// SPDX-License-Identifier: Apache-2.0

//! The `Grouper` dispatch enum: one compiled grouping function per
//! downstream component, closed over its resolved task id list.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHasher;
use executor_model::{TaskId, Values};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};

use crate::topology::WorkerTopology;

/// A user-supplied custom grouping function. Optionally load-aware: the
/// second argument, when non-`None`, reports the current load of a
/// candidate task so the function can bias its choice.
pub type CustomGrouper =
    Arc<dyn Fn(&Values, &[TaskId], Option<&dyn Fn(TaskId) -> f64>) -> Vec<TaskId> + Send + Sync>;

/// The eight grouping kinds named in the grouping table, plus the
/// parameters each needs at compile time.
pub enum GrouperKind {
    /// Round-robin, or load-aware power-of-two-choices when a load probe is
    /// supplied.
    Shuffle,
    /// Hash of the named fields, modulo the downstream task count.
    Fields { fields: Vec<String> },
    /// Every downstream task.
    All,
    /// Always the lowest downstream task id.
    Global,
    /// Alias for `Shuffle`.
    None,
    /// Destination supplied by the emitter; membership is validated against
    /// the downstream set.
    Direct,
    /// Prefer downstream tasks on the emitting task's own worker; otherwise
    /// falls back to `Shuffle`.
    LocalOrShuffle,
    /// User-supplied function.
    Custom(CustomGrouper),
}

/// Extra, per-call context a grouper may need beyond the tuple's values.
pub struct SelectContext<'a> {
    pub values: &'a Values,
    /// The explicit destination for `Direct` groupings (the task id the
    /// emitter asked to send to).
    pub direct_dest: Option<TaskId>,
    /// The worker address the emitting task is hosted on, for
    /// `Local-or-shuffle`.
    pub source_worker: &'a str,
    pub topology: &'a WorkerTopology,
    pub load: Option<&'a dyn Fn(TaskId) -> f64>,
}

/// A compiled grouper for one (stream, downstream component) pair: the
/// grouping kind plus the resolved, ascending-sorted list of downstream
/// task ids.
pub struct Grouper {
    kind: GrouperKind,
    downstream: Vec<TaskId>,
    round_robin: AtomicUsize,
    rng: Mutex<rand::rngs::StdRng>,
}

/// Error selecting a destination.
#[derive(thiserror::Error, Debug)]
pub enum GrouperError {
    #[error("direct-grouping destination {0} is not a member of the downstream task set")]
    NotAMember(TaskId),
    #[error("direct grouping requires an explicit destination")]
    MissingDirectDest,
}

impl Grouper {
    /// Builds a grouper over an ascending-sorted downstream task id list.
    /// Panics (at registry build time, never per-tuple) if `downstream` is
    /// empty — callers must represent "no subscribers" as a `null` entry
    /// one level up, in the registry.
    #[must_use]
    pub fn new(kind: GrouperKind, mut downstream: Vec<TaskId>) -> Self {
        assert!(
            !downstream.is_empty(),
            "Grouper requires a non-empty downstream set; represent no-subscriber streams as a registry-level null entry"
        );
        downstream.sort_unstable();
        Grouper {
            kind,
            downstream,
            round_robin: AtomicUsize::new(0),
            rng: Mutex::new(rand::rngs::StdRng::from_entropy()),
        }
    }

    /// The downstream task ids this grouper can route to.
    #[must_use]
    pub fn downstream(&self) -> &[TaskId] {
        &self.downstream
    }

    /// Selects destination task ids for one emitted tuple. Always
    /// non-empty for a grouper constructed with a non-empty downstream set.
    pub fn select(&self, ctx: &SelectContext<'_>) -> Result<Vec<TaskId>, GrouperError> {
        match &self.kind {
            GrouperKind::All => Ok(self.downstream.clone()),
            GrouperKind::Global => Ok(vec![self.downstream[0]]),
            GrouperKind::Shuffle | GrouperKind::None => Ok(vec![self.shuffle_pick(ctx.load)]),
            GrouperKind::Fields { fields } => Ok(vec![self.fields_pick(fields, ctx.values)]),
            GrouperKind::Direct => {
                let dest = ctx.direct_dest.ok_or(GrouperError::MissingDirectDest)?;
                if self.downstream.binary_search(&dest).is_ok() {
                    Ok(vec![dest])
                } else {
                    Err(GrouperError::NotAMember(dest))
                }
            }
            GrouperKind::LocalOrShuffle => {
                let local: Vec<TaskId> = self
                    .downstream
                    .iter()
                    .copied()
                    .filter(|&t| ctx.topology.worker_of(t) == Some(ctx.source_worker))
                    .collect();
                if local.is_empty() {
                    Ok(vec![self.shuffle_pick(ctx.load)])
                } else {
                    let idx = self.round_robin.fetch_add(1, Ordering::Relaxed) % local.len();
                    Ok(vec![local[idx]])
                }
            }
            GrouperKind::Custom(f) => Ok(f(ctx.values, &self.downstream, ctx.load)),
        }
    }

    fn shuffle_pick(&self, load: Option<&dyn Fn(TaskId) -> f64>) -> TaskId {
        match load {
            // Power-of-two-choices: draw two distinct random candidates and
            // take the less loaded one, biasing away from hot tasks.
            Some(load_of) if self.downstream.len() > 1 => {
                let mut rng = self.rng.lock();
                let i = rng.gen_range(0..self.downstream.len());
                let mut j = rng.gen_range(0..self.downstream.len() - 1);
                if j >= i {
                    j += 1;
                }
                let (a, b) = (self.downstream[i], self.downstream[j]);
                if load_of(a) <= load_of(b) { a } else { b }
            }
            _ => {
                let idx = self.round_robin.fetch_add(1, Ordering::Relaxed) % self.downstream.len();
                self.downstream[idx]
            }
        }
    }

    fn fields_pick(&self, fields: &[String], values: &Values) -> TaskId {
        let mut hasher = AHasher::default();
        for field in fields {
            values.get(field).map(|v| v.to_string()).hash(&mut hasher);
        }
        let idx = (hasher.finish() as usize) % self.downstream.len();
        self.downstream[idx]
    }
}
