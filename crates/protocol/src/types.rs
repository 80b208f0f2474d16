//! Shared value types: preference documents and search results.
//!
//! Unlike the identifiers in [`crate::identifiers`], these types carry
//! structured values and participate in domain operations (merging, streaming).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PluginId;

// ---------------------------------------------------------------------------
// Preference documents
// ---------------------------------------------------------------------------

/// A preference document: a JSON object of keys to arbitrary values.
pub type Document = Map<String, Value>;

/// Applies a partial update to `target`.
///
/// Keys present in `patch` overwrite the same keys in `target`; every other key
/// in `target` is retained. The merge is shallow: a nested object in `patch`
/// replaces the nested object in `target` wholesale.
pub fn merge_document(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// One result batch produced by a plugin for a search query.
///
/// `result_type` and `payload` are opaque to the worker; the orchestrator's UI
/// interprets them (e.g. `"add"` with a list of result items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result kind, forwarded as the `type` field.
    #[serde(rename = "type")]
    pub result_type: String,
    /// Result body.
    pub payload: Value,
}

impl SearchResult {
    /// Creates a result of the given kind.
    pub fn new(result_type: impl Into<String>, payload: Value) -> Self {
        Self {
            result_type: result_type.into(),
            payload,
        }
    }
}

/// A fault raised by one plugin while the others keep producing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginFault {
    /// The plugin that failed.
    pub plugin: PluginId,
    /// Human-readable failure description.
    pub message: String,
}

impl std::fmt::Display for PluginFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plugin '{}' failed: {}", self.plugin, self.message)
    }
}

/// One item of a search result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// A result to forward under the search's ticket.
    Result(SearchResult),
    /// A per-plugin fault; the stream continues with the remaining plugins.
    Fault(PluginFault),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_merge_keeps_existing_keys() {
        let mut target = Document::new();
        merge_document(&mut target, doc(json!({"a": 1})));
        merge_document(&mut target, doc(json!({"b": 2})));
        assert_eq!(Value::Object(target), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut target = doc(json!({"a": 1, "nested": {"x": 1, "y": 2}}));
        merge_document(&mut target, doc(json!({"a": 1})));
        merge_document(&mut target, doc(json!({"a": 3, "nested": {"x": 9}})));
        assert_eq!(
            Value::Object(target),
            json!({"a": 3, "nested": {"x": 9}})
        );
    }

    #[test]
    fn test_search_result_uses_type_field() {
        let result = SearchResult::new("add", json!([{"title": "x"}]));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"type": "add", "payload": [{"title": "x"}]})
        );
    }
}
