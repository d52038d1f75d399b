//! Per-field state merge policy (channels).
//!
//! Each top-level state field may declare a channel describing how a node's
//! partial update is folded into the accumulated state. The table is built
//! once at graph construction and applied generically by the executor; fields
//! without a declared channel default to [`ChannelType::LastValue`].
//!
//! Merge rules:
//!
//! - **LastValue** — `new ?? old`: a non-null update replaces the old value,
//!   a `null` (or absent) update keeps it. Because `null` never overwrites,
//!   a populated scalar such as an `error` marker cannot be cleared by a
//!   later merge.
//! - **ShallowMerge** — object merge, one level deep: new keys override old
//!   keys of the same name, unrelated keys accumulate.
//! - **Custom** — an arbitrary pure reducer `(old, new) -> merged`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

/// Reducer function type for [`ChannelType::Custom`] channels.
///
/// Combines the current value with an incoming update. Reducers must be pure:
/// the result depends only on the two arguments.
pub type ReducerFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Channel storage strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelType {
    /// Keep the most recent non-null value.
    LastValue,
    /// Shallow object merge, update keys override.
    ShallowMerge,
    /// Merge through the channel's reducer function.
    Custom,
}

/// Channel specification: a field name, a merge strategy, and (for custom
/// channels) the reducer.
#[derive(Clone)]
pub struct ChannelSpec {
    /// State field this channel governs.
    pub name: String,
    /// Merge strategy.
    pub channel_type: ChannelType,
    /// Reducer, required for `Custom` channels and ignored otherwise.
    pub reducer: Option<ReducerFn>,
}

impl Debug for ChannelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSpec")
            .field("name", &self.name)
            .field("channel_type", &self.channel_type)
            .field("reducer", &self.reducer.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// Fold a node's partial update into the accumulated state.
///
/// Both `state` and `update` are expected to be JSON objects; non-object
/// updates are ignored. Each key of the update is merged through its channel,
/// defaulting to LastValue for undeclared fields.
pub fn apply_update(
    channels: &HashMap<String, ChannelSpec>,
    state: Value,
    update: Value,
) -> Value {
    let mut merged = match state {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let update = match update {
        Value::Object(map) => map,
        _ => return Value::Object(merged),
    };

    for (key, new) in update {
        let old = merged.remove(&key).unwrap_or(Value::Null);
        let channel_type = channels
            .get(&key)
            .map(|c| c.channel_type.clone())
            .unwrap_or(ChannelType::LastValue);

        let value = match channel_type {
            ChannelType::LastValue => last_value(old, new),
            ChannelType::ShallowMerge => shallow_merge(old, new),
            ChannelType::Custom => match channels.get(&key).and_then(|c| c.reducer.clone()) {
                Some(reducer) => reducer(old, new),
                None => last_value(old, new),
            },
        };
        merged.insert(key, value);
    }

    Value::Object(merged)
}

fn last_value(old: Value, new: Value) -> Value {
    if new.is_null() {
        old
    } else {
        new
    }
}

fn shallow_merge(old: Value, new: Value) -> Value {
    match (old, new) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (k, v) in overlay {
                base.insert(k, v);
            }
            Value::Object(base)
        }
        (old, new) => last_value(old, new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channels() -> HashMap<String, ChannelSpec> {
        let mut map = HashMap::new();
        map.insert(
            "metadata".to_string(),
            ChannelSpec {
                name: "metadata".to_string(),
                channel_type: ChannelType::ShallowMerge,
                reducer: None,
            },
        );
        map
    }

    #[test]
    fn last_value_replaces_and_keeps() {
        let state = json!({"error": "boom"});
        let merged = apply_update(&channels(), state, json!({"error": "worse"}));
        assert_eq!(merged["error"], "worse");

        let merged = apply_update(&channels(), merged, json!({"error": null}));
        assert_eq!(merged["error"], "worse", "null must not clear a value");
    }

    #[test]
    fn shallow_merge_accumulates_keys() {
        let state = json!({"metadata": {"a": 1, "shared": "old"}});
        let merged = apply_update(
            &channels(),
            state,
            json!({"metadata": {"b": 2, "shared": "new"}}),
        );
        assert_eq!(merged["metadata"], json!({"a": 1, "b": 2, "shared": "new"}));
    }

    #[test]
    fn sequential_updates_match_single_combined_merge() {
        // metadata shallow-merge is associative per key
        let base = json!({"metadata": {}});
        let p1 = json!({"metadata": {"x": 1}});
        let p2 = json!({"metadata": {"y": 2}});

        let stepped = apply_update(&channels(), apply_update(&channels(), base.clone(), p1), p2);
        let combined = apply_update(&channels(), base, json!({"metadata": {"x": 1, "y": 2}}));
        assert_eq!(stepped["metadata"], combined["metadata"]);
    }

    #[test]
    fn custom_reducer_is_applied() {
        let mut map = HashMap::new();
        map.insert(
            "count".to_string(),
            ChannelSpec {
                name: "count".to_string(),
                channel_type: ChannelType::Custom,
                reducer: Some(Arc::new(|old, new| {
                    json!(old.as_i64().unwrap_or(0) + new.as_i64().unwrap_or(0))
                })),
            },
        );
        let merged = apply_update(&map, json!({"count": 3}), json!({"count": 4}));
        assert_eq!(merged["count"], 7);
    }

    #[test]
    fn undeclared_fields_default_to_last_value() {
        let merged = apply_update(&HashMap::new(), json!({"x": 1}), json!({"x": 2, "y": 3}));
        assert_eq!(merged, json!({"x": 2, "y": 3}));
    }
}
