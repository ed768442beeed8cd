use serde_json::{Map, Value};

/// Convert a delimiter-separated key (`dead-letter-uri`, `dead_letter_uri`)
/// to camelCase (`deadLetterUri`). Keys without delimiters are returned as-is.
pub fn to_camel_case(key: &str) -> String {
    if !key.contains(['-', '_']) || key.starts_with(['-', '_']) {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '-' || c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively rewrite every map key of `value` to camelCase.
///
/// When two keys collapse onto the same camelCase name the one appearing
/// later in the input wins.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::with_capacity(map.len());
            for (key, inner) in map {
                let camel = to_camel_case(&key);
                if camel != key {
                    tracing::trace!(from = %key, to = %camel, "Normalized key");
                }
                normalized.insert(camel, normalize_keys(inner));
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kebab_and_snake_become_camel() {
        assert_eq!(to_camel_case("dead-letter-uri"), "deadLetterUri");
        assert_eq!(to_camel_case("dead_letter_uri"), "deadLetterUri");
        assert_eq!(to_camel_case("route-configuration"), "routeConfiguration");
    }

    #[test]
    fn camel_and_plain_keys_are_untouched() {
        assert_eq!(to_camel_case("routeTemplate"), "routeTemplate");
        assert_eq!(to_camel_case("uri"), "uri");
        assert_eq!(to_camel_case("_private"), "_private");
    }

    #[test]
    fn normalize_walks_nested_maps_and_sequences() {
        let raw = json!([{
            "route-configuration": {
                "on-exception": [{ "on-exception": { "handled": { "constant": "true" } } }]
            }
        }]);
        let normalized = normalize_keys(raw);
        assert_eq!(
            normalized,
            json!([{
                "routeConfiguration": {
                    "onException": [{ "onException": { "handled": { "constant": "true" } } }]
                }
            }])
        );
    }

    #[test]
    fn normalize_leaves_values_alone() {
        let raw = json!({ "log": { "message": "dead-letter_{{ my-param }}" } });
        assert_eq!(normalize_keys(raw.clone()), raw);
    }
}
