//! Placeholder Scanner: collects `{{name}}` property placeholders.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use serde_json::Value;

use crate::export::document_to_raw;
use crate::node::Document;

static PLACEHOLDER_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid regex"));

/// Every placeholder name found in the strings of `value`, at any depth.
///
/// Only the first `{{ }}` pair of each string counts. Names are trimmed; a
/// blank `{{ }}` names nothing and is skipped rather than recorded as `""`.
/// Map keys are not scanned.
pub fn collect_placeholders(value: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    scan(value, &mut names);
    names
}

/// Placeholders used anywhere in a document, as serialized.
pub fn document_placeholders(document: &Document) -> BTreeSet<String> {
    collect_placeholders(&document_to_raw(document))
}

/// The placeholder name of a string that is a `{{ }}` reference, if any.
pub fn placeholder_name(text: &str) -> Option<&str> {
    let name = PLACEHOLDER_RE.captures(text)?.get(1)?.as_str().trim();
    (!name.is_empty()).then_some(name)
}

fn scan(value: &Value, names: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => {
            if let Some(name) = placeholder_name(text) {
                names.insert(name.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| scan(item, names)),
        Value::Object(map) => map.values().for_each(|item| scan(item, names)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_trimmed_name() {
        let names = collect_placeholders(&json!({ "uri": "{{ myParam }}" }));
        assert_eq!(names, BTreeSet::from(["myParam".to_string()]));
    }

    #[test]
    fn plain_strings_have_none() {
        assert!(collect_placeholders(&json!({ "uri": "plain" })).is_empty());
        assert!(collect_placeholders(&json!({ "uri": "{{   }}" })).is_empty());
        assert!(collect_placeholders(&json!({ "uri": "{{ open" })).is_empty());
    }

    #[test]
    fn only_first_pair_per_string() {
        let names = collect_placeholders(&json!("kafka:{{topic}}?brokers={{brokers}}"));
        assert_eq!(names, BTreeSet::from(["topic".to_string()]));
    }

    #[test]
    fn nested_and_deduplicated() {
        let value = json!([
            { "a": { "b": ["{{x}}", 1, null, true] } },
            { "{{key}}": "{{ x }}", "c": "prefix {{y}} suffix" }
        ]);
        let names: Vec<_> = collect_placeholders(&value).into_iter().collect();
        assert_eq!(names, vec!["x", "y"]);
    }
}
