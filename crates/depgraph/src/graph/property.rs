//! Property system for open, type-specific entity and relationship attributes.
//!
//! Entity and relationship types are open strings, so their attributes cannot be a
//! fixed schema. [`PropertyMap`] stores them as typed values keyed by name and
//! converts to and from the flat JSON object form that API collaborators exchange.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Strongly-typed property value for entity/relationship metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// String value (status, description, location)
    String(String),
    /// Integer value (team size, headcount)
    Int(i64),
    /// Floating point value (budgets, scores)
    Float(f64),
    /// Boolean flag (mandatory, archived)
    Bool(bool),
    /// List of strings (tech stack, tags)
    StringList(Vec<String>),
    /// List of integers
    IntList(Vec<i64>),
    /// Explicit null/absence of value
    Null,
}

impl PropertyValue {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::StringList(_) => "string_list",
            PropertyValue::IntList(_) => "int_list",
            PropertyValue::Null => "null",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Int(i) => Value::Number(Number::from(*i)),
            // Graph writes reject NaN and infinities, so only hand-built maps reach `Null`
            PropertyValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::StringList(list) => {
                Value::Array(list.iter().cloned().map(Value::String).collect())
            }
            PropertyValue::IntList(list) => Value::Array(
                list.iter().map(|i| Value::Number(Number::from(*i))).collect(),
            ),
            PropertyValue::Null => Value::Null,
        }
    }

    fn from_json(key: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(PropertyValue::Null),
            Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            Value::String(s) => Ok(PropertyValue::String(s)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(PropertyValue::Int(i)),
                None => n.as_f64().map(PropertyValue::Float).ok_or_else(|| {
                    GraphError::invalid_argument(format!(
                        "property '{key}' holds a number outside the supported range"
                    ))
                }),
            },
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    Ok(PropertyValue::StringList(
                        items
                            .into_iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                    ))
                } else if items.iter().all(Value::is_i64) {
                    Ok(PropertyValue::IntList(
                        items.iter().filter_map(Value::as_i64).collect(),
                    ))
                } else {
                    Err(GraphError::invalid_argument(format!(
                        "property '{key}' must be a list of strings or a list of integers"
                    )))
                }
            }
            Value::Object(_) => Err(GraphError::invalid_argument(format!(
                "property '{key}' is a nested object; properties must be flat"
            ))),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::StringList(value)
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(value: Vec<&str>) -> Self {
        PropertyValue::StringList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(value: Vec<i64>) -> Self {
        PropertyValue::IntList(value)
    }
}

/// Open key-value attribute store for entities and relationships.
///
/// Keys are kept sorted so serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMap {
    data: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Create a new empty property map.
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Builder pattern: add a property and return self.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Parse the flat JSON object form, e.g. `{"status":"ACTIVE","size":12}`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Serialization`] for malformed JSON and
    /// [`GraphError::InvalidArgument`] for non-object input, nested objects or
    /// mixed-type lists.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| GraphError::serialization("Failed to parse properties JSON", Some(e)))?;
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| PropertyValue::from_json(&k, v).map(|pv| (k, pv)))
                .collect(),
            other => Err(GraphError::invalid_argument(format!(
                "properties must be a JSON object, got {other}"
            ))),
        }
    }

    /// Render the flat JSON object form.
    pub fn to_json_value(&self) -> Value {
        let map: Map<String, Value> = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Render the flat JSON object form as a string.
    pub fn to_json_string(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Reject NaN and infinite floats, which have no JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidArgument`] naming the first offending key.
    pub fn check_finite(&self) -> Result<()> {
        match self
            .data
            .iter()
            .find(|(_, value)| matches!(value, PropertyValue::Float(f) if !f.is_finite()))
        {
            Some((key, value)) => Err(GraphError::invalid_argument(format!(
                "property '{key}' holds a non-finite float ({value:?})"
            ))),
            None => Ok(()),
        }
    }

    /// Insert a property value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// Merge `other` into this map, overwriting duplicate keys.
    pub fn merge(&mut self, other: PropertyMap) {
        self.data.extend(other.data);
    }

    /// Get a property value by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.data.get(key)
    }

    /// Remove a property by key.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.data.remove(key)
    }

    /// Check if a property exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Get the number of properties.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the property map is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.data.iter()
    }

    /// Type-safe getter for string properties.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.data.get(key) {
            Some(PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Type-safe getter for integer properties.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.data.get(key) {
            Some(PropertyValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Type-safe getter for float properties.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.data.get(key) {
            Some(PropertyValue::Float(f)) => Some(*f),
            _ => None,
        }
    }

    /// Type-safe getter for boolean properties.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.data.get(key) {
            Some(PropertyValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Type-safe getter for string list properties.
    pub fn get_string_list(&self, key: &str) -> Option<&[String]> {
        match self.data.get(key) {
            Some(PropertyValue::StringList(list)) => Some(list),
            _ => None,
        }
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self {
            data: BTreeMap::from_iter(iter),
        }
    }
}
