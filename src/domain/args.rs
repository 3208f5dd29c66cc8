//! Model construction arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BindError;

/// Opaque key→value arguments supplied when a model is constructed.
///
/// Backed by a key-sorted JSON object, so [`ModelArgs::canonical`] is stable
/// across equal argument sets regardless of insertion order. Arguments are
/// fixed for the life of a fetch cycle; [`ModelArgs::set`] exists for hosts
/// that deliberately replace a value before binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelArgs {
    entries: Map<String, Value>,
}

impl ModelArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Accepts a JSON object or `null` (treated as empty). Anything else is
    /// a usage error surfaced to the caller.
    pub fn from_value(value: Value) -> Result<Self, BindError> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            Value::Null => Ok(Self::default()),
            other => Err(BindError::InvalidArguments {
                kind: json_kind(&other),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Canonical serialized form used as cache-key material.
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<Map<String, Value>> for ModelArgs {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
