//! Raw document I/O for Routeweave.
//!
//! This is the serialization boundary of the tree engine. Documents come in as
//! JSON or YAML text and leave this crate as a generic `serde_json::Value`
//! ("the raw shape") with every map key normalized to camelCase. The typed
//! engine in `routeweave-tree` consumes that shape and walks back out to it.
//!
//! # Example
//! ```
//! let raw = routeweave_dsl::parse_yaml("- from:\n    uri: timer:tick\n    steps: []\n").unwrap();
//! let (kind, body) = routeweave_dsl::single_entry(&raw[0]).unwrap();
//! assert_eq!(kind, "from");
//! assert_eq!(body["uri"], "timer:tick");
//! ```

mod case;
mod format;

pub use case::{normalize_keys, to_camel_case};
pub use format::{
    load_document, parse_json, parse_str, parse_yaml, save_document, to_json_string, to_string,
    to_yaml_string, Format,
};

use serde_json::{Map, Value};

/// Split a `{ kindName: body }` entry into its key and body.
///
/// Returns `None` unless `value` is a map with exactly one key.
pub fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.iter().next().map(|(k, v)| (k.as_str(), v))
}

/// Build a `{ kindName: body }` entry.
pub fn wrap_entry(kind_name: &str, body: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(kind_name.to_string(), body);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_entry_splits_one_key_maps() {
        let entry = json!({ "to": { "uri": "log:x" } });
        let (kind, body) = single_entry(&entry).unwrap();
        assert_eq!(kind, "to");
        assert_eq!(body, &json!({ "uri": "log:x" }));
    }

    #[test]
    fn single_entry_rejects_other_shapes() {
        assert!(single_entry(&json!({ "a": 1, "b": 2 })).is_none());
        assert!(single_entry(&json!({})).is_none());
        assert!(single_entry(&json!("to")).is_none());
        assert!(single_entry(&json!([{ "to": "x" }])).is_none());
    }

    #[test]
    fn wrap_entry_is_inverse_of_single_entry() {
        let wrapped = wrap_entry("log", json!("hi"));
        assert_eq!(wrapped, json!({ "log": "hi" }));
        assert_eq!(single_entry(&wrapped), Some(("log", &json!("hi"))));
    }
}
