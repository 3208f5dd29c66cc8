//! Per-fetch data tree assembly and merge rules.
//!
//! Top-level keys are model identities; each entry is a JSON object owned by
//! that model. The tree lives for exactly one fetch cycle and is handed to
//! the external renderer as a plain JSON value.

use serde_json::{Map, Value};

use super::error::BindError;

/// Hierarchical key→value result structure assembled over one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTree {
    roots: Map<String, Value>,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `identity` has an entry. Called once when a model's fetch
    /// begins, so the entry exists even if no method binds anything.
    pub fn ensure(&mut self, identity: &str) {
        self.entry_mut(identity);
    }

    /// Shallow overwrite of one key in a model's entry. Used for method
    /// results: the derived data key is replaced wholesale, never deep-merged.
    pub fn set(&mut self, identity: &str, key: &str, value: Value) {
        self.entry_mut(identity).insert(key.to_string(), value);
    }

    /// `bind` semantics for the model's own entry.
    ///
    /// Mapping values merge key-wise into an existing mapping (incoming keys
    /// win); non-mapping values overwrite. A mapping landing on an existing
    /// non-mapping is skipped — compatibility quirk, kept but not extended.
    pub fn bind(&mut self, identity: &str, key: &str, value: Value) -> Result<(), BindError> {
        if key.is_empty() {
            return Err(BindError::MissingBindKey);
        }
        let entry = self.entry_mut(identity);
        match value {
            Value::Object(incoming) => match entry.entry(key.to_string()) {
                serde_json::map::Entry::Occupied(mut slot) => {
                    if let Value::Object(existing) = slot.get_mut() {
                        for (k, v) in incoming {
                            existing.insert(k, v);
                        }
                    }
                    // existing non-mapping: merge skipped, kept for compatibility
                }
                serde_json::map::Entry::Vacant(slot) => {
                    slot.insert(Value::Object(incoming));
                }
            },
            other => {
                entry.insert(key.to_string(), other);
            }
        }
        Ok(())
    }

    /// `bind` scoped to an explicit target identity: always write/overwrite.
    pub fn bind_to(&mut self, target: &str, key: &str, value: Value) -> Result<(), BindError> {
        if key.is_empty() {
            return Err(BindError::MissingBindKey);
        }
        self.entry_mut(target).insert(key.to_string(), value);
        Ok(())
    }

    /// Merge a submodel's result at the top level (root-parent case). An
    /// existing entry merges by shallow key overwrite, never wholesale.
    pub fn merge_root(&mut self, identity: &str, data: Map<String, Value>) {
        let entry = self.entry_mut(identity);
        for (k, v) in data {
            entry.insert(k, v);
        }
    }

    /// Merge a submodel's result under `identity`'s own entry (nested case),
    /// with the same merge-on-existing-key rule.
    pub fn merge_nested(&mut self, identity: &str, child: &str, data: Map<String, Value>) {
        let entry = self.entry_mut(identity);
        match entry.entry(child.to_string()) {
            serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Object(existing) => {
                    for (k, v) in data {
                        existing.insert(k, v);
                    }
                }
                other => {
                    *other = Value::Object(data);
                }
            },
            serde_json::map::Entry::Vacant(slot) => {
                slot.insert(Value::Object(data));
            }
        }
    }

    pub fn root(&self, identity: &str) -> Option<&Value> {
        self.roots.get(identity)
    }

    /// Remove and return a model's entry as a plain map. Missing or
    /// non-object entries come back empty.
    pub fn take_root(&mut self, identity: &str) -> Map<String, Value> {
        match self.roots.remove(identity) {
            Some(Value::Object(entry)) => entry,
            _ => Map::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.roots)
    }

    fn entry_mut(&mut self, identity: &str) -> &mut Map<String, Value> {
        let slot = self
            .roots
            .entry(identity.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(entry) => entry,
            _ => unreachable!("entry is always an object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn ensure_creates_empty_entry() {
        let mut tree = DataTree::new();
        tree.ensure("Page");
        assert_eq!(tree.root("Page"), Some(&json!({})));
    }

    #[test]
    fn set_overwrites_existing_key_wholesale() {
        let mut tree = DataTree::new();
        tree.set("Page", "content", json!({"title": "old", "tags": [1]}));
        tree.set("Page", "content", json!({"title": "new"}));
        assert_eq!(tree.root("Page"), Some(&json!({"content": {"title": "new"}})));
    }

    #[test]
    fn bind_merges_two_mappings_key_wise() {
        let mut tree = DataTree::new();
        tree.bind("Page", "meta", json!({"a": 1, "b": 2})).unwrap();
        tree.bind("Page", "meta", json!({"b": 3, "c": 4})).unwrap();
        assert_eq!(
            tree.root("Page"),
            Some(&json!({"meta": {"a": 1, "b": 3, "c": 4}}))
        );
    }

    #[test]
    fn bind_non_mapping_replaces_existing_value() {
        let mut tree = DataTree::new();
        tree.bind("Page", "count", json!({"a": 1})).unwrap();
        tree.bind("Page", "count", json!(5)).unwrap();
        assert_eq!(tree.root("Page"), Some(&json!({"count": 5})));
    }

    #[test]
    fn bind_mapping_onto_non_mapping_is_skipped() {
        let mut tree = DataTree::new();
        tree.bind("Page", "count", json!(5)).unwrap();
        tree.bind("Page", "count", json!({"a": 1})).unwrap();
        assert_eq!(tree.root("Page"), Some(&json!({"count": 5})));
    }

    #[test]
    fn bind_rejects_empty_key() {
        let mut tree = DataTree::new();
        let err = tree.bind("Page", "", json!(1)).expect_err("empty key");
        assert!(matches!(err, BindError::MissingBindKey));
    }

    #[test]
    fn bind_to_targets_other_identity_and_overwrites() {
        let mut tree = DataTree::new();
        tree.bind_to("Sidebar", "widgets", json!({"a": 1})).unwrap();
        tree.bind_to("Sidebar", "widgets", json!({"b": 2})).unwrap();
        assert_eq!(tree.root("Sidebar"), Some(&json!({"widgets": {"b": 2}})));
    }

    #[test]
    fn merge_root_overwrites_per_key() {
        let mut tree = DataTree::new();
        tree.merge_root("Footer", as_map(json!({"links": [1], "copy": "a"})));
        tree.merge_root("Footer", as_map(json!({"copy": "b"})));
        assert_eq!(tree.root("Footer"), Some(&json!({"links": [1], "copy": "b"})));
    }

    #[test]
    fn merge_nested_lands_inside_parent_entry() {
        let mut tree = DataTree::new();
        tree.ensure("Footer");
        tree.merge_nested("Footer", "Social", as_map(json!({"icons": 3})));
        tree.merge_nested("Footer", "Social", as_map(json!({"handle": "@x"})));
        assert_eq!(
            tree.root("Footer"),
            Some(&json!({"Social": {"icons": 3, "handle": "@x"}}))
        );
    }

    #[test]
    fn take_root_removes_entry() {
        let mut tree = DataTree::new();
        tree.set("Page", "content", json!(1));
        let taken = tree.take_root("Page");
        assert_eq!(taken.get("content"), Some(&json!(1)));
        assert!(tree.root("Page").is_none());
        assert!(tree.take_root("Page").is_empty());
    }
}
