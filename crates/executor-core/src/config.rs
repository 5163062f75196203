// SPDX-License-Identifier: Apache-2.0

//! Component configuration normalization (`spec.md` §4.10/§3/§6).

use std::collections::BTreeMap;
use serde_json::Value;

use crate::error::Error;

/// A flattened configuration: topology options overlaid by whatever the
/// component is allowed to override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config(BTreeMap<String, Value>);

/// Config keys a component's JSON blob is allowed to override. Every other
/// key in the component blob is stripped before overlay, per `spec.md` §3.
const COMPONENT_OVERRIDABLE_KEYS: &[&str] = &[
    "topology.debug",
    "topology.max.spout.pending",
    "topology.max.task.parallelism",
    "topology.transactional.id",
    "topology.tick.tuple.freq.secs",
    "topology.sleep.spout.wait.strategy.time.ms",
    "topology.spout.wait.strategy",
    "topology.windowing.length.count",
    "topology.windowing.length.duration.ms",
    "topology.windowing.interval.count",
    "topology.windowing.interval.duration.ms",
    "topology.tuple.timestamp.field",
    "topology.tuple.timestamp.max.lag.ms",
    "topology.message.id.field",
    "topology.state.provider",
    "topology.state.provider.config",
    "topology.late.tuple.stream",
];

impl Config {
    /// Wraps an already-flat map as a `Config`, e.g. the worker's topology
    /// options.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, Value>) -> Self {
        Config(map)
    }

    /// Looks up a key in the effective configuration.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Convenience accessor for boolean-valued keys, defaulting to `false`
    /// when absent or not a bool.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// The underlying key/value pairs, in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Normalizes component configuration: parses `component_json`, strips
    /// every key not in the component-overridable allow-list, then
    /// overlays the remainder onto `self` (the topology options), with the
    /// component winning on conflicts.
    ///
    /// Idempotent: normalizing an already-normalized config with the same
    /// component JSON yields the same result (invariant 5 / round-trip
    /// property in `spec.md` §8).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `component_json` is not a JSON object.
    pub fn normalize(&self, component_json: &str) -> Result<Config, Error> {
        let parsed: Value = if component_json.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(component_json)
                .map_err(|e| Error::Config(format!("invalid component config JSON: {e}")))?
        };
        let Value::Object(object) = parsed else {
            return Err(Error::Config(
                "component config must be a JSON object".to_owned(),
            ));
        };

        let mut effective = self.0.clone();
        for (key, value) in object {
            if COMPONENT_OVERRIDABLE_KEYS.contains(&key.as_str()) {
                effective.insert(key, value);
            }
        }
        Ok(Config(effective))
    }
}
