//! Property bags
//!
//! Files, operations, content units and collections carry an opaque
//! key-to-value map persisted as a JSON document. Every update is a shallow,
//! right-biased merge.

use serde_json::{Map, Value};

/// Semi-structured attribute bag
pub type Properties = Map<String, Value>;

/// Merge `updates` into an optional existing bag
///
/// Keys in `updates` overwrite existing keys, keys absent from `updates` are
/// preserved, and a missing bag is replaced by `updates` as a whole.
pub fn merge(existing: Option<&Properties>, updates: &Properties) -> Properties {
    match existing {
        None => updates.clone(),
        Some(existing) => {
            let mut merged = existing.clone();
            for (k, v) in updates {
                merged.insert(k.clone(), v.clone());
            }
            merged
        }
    }
}

/// Parse a stored bag (NULL column maps to `None`)
pub fn from_column(raw: Option<String>) -> serde_json::Result<Option<Properties>> {
    raw.map(|s| serde_json::from_str(&s)).transpose()
}

/// Serialize a bag for storage
pub fn to_column(props: Option<&Properties>) -> serde_json::Result<Option<String>> {
    props.map(serde_json::to_string).transpose()
}

/// Build a bag from a JSON object literal, e.g. `props(json!({"duration": 1.5}))`
///
/// Non-object values produce an empty bag.
pub fn props(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}
