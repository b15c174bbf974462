//! Fill Payloads - Raw input values and their per-relation shapes

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{FillError, FillResult, ModelError, ModelResult};
use crate::model::{Attributes, FillRecord};

/// A single input value: plain JSON, an already constructed record, or a
/// list mixing both
#[derive(Debug)]
pub enum FillValue {
    Value(Value),
    Record(Box<dyn FillRecord>),
    List(Vec<FillValue>),
}

/// What a to-one payload, or one element of a to-many payload, resolves to
pub(crate) enum RelatedInput {
    Attributes(Attributes),
    Record(Box<dyn FillRecord>),
}

impl FillValue {
    /// Wrap an already constructed record
    pub fn record(record: impl FillRecord + 'static) -> Self {
        FillValue::Record(Box::new(record))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FillValue::Value(Value::Null))
    }

    /// Whether this is a map carrying a non-null `field`
    pub fn has_field(&self, field: &str) -> bool {
        match self {
            FillValue::Value(Value::Object(map)) => {
                map.get(field).map(|v| !v.is_null()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Convert back to plain JSON; `None` if a record is involved
    pub fn into_json(self) -> Option<Value> {
        match self {
            FillValue::Value(value) => Some(value),
            FillValue::Record(_) => None,
            FillValue::List(items) => items
                .into_iter()
                .map(FillValue::into_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }

    /// Shape for to-one relations: a map or a record
    pub(crate) fn into_related(self, relation: &str) -> FillResult<RelatedInput> {
        match self {
            FillValue::Value(Value::Object(map)) => {
                Ok(RelatedInput::Attributes(map.into_iter().collect()))
            }
            FillValue::Record(record) => Ok(RelatedInput::Record(record)),
            FillValue::Value(other) => Err(FillError::invalid_payload(
                relation,
                format!("expected an attribute map or a record, got {}", json_kind(&other)),
            )),
            FillValue::List(_) => Err(FillError::invalid_payload(
                relation,
                "expected an attribute map or a record, got a list",
            )),
        }
    }

    /// Shape for to-many relations: a list of maps and/or records
    pub(crate) fn into_items(self, relation: &str) -> FillResult<Vec<FillValue>> {
        match self {
            FillValue::List(items) => Ok(items),
            FillValue::Value(Value::Array(items)) => {
                Ok(items.into_iter().map(FillValue::Value).collect())
            }
            FillValue::Value(other) => Err(FillError::invalid_payload(
                relation,
                format!("expected a list, got {}", json_kind(&other)),
            )),
            FillValue::Record(_) => Err(FillError::invalid_payload(
                relation,
                "expected a list, got a single record",
            )),
        }
    }
}

impl From<Value> for FillValue {
    fn from(value: Value) -> Self {
        FillValue::Value(value)
    }
}

impl From<Vec<FillValue>> for FillValue {
    fn from(items: Vec<FillValue>) -> Self {
        FillValue::List(items)
    }
}

impl From<Box<dyn FillRecord>> for FillValue {
    fn from(record: Box<dyn FillRecord>) -> Self {
        FillValue::Record(record)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

/// Raw, untrusted input for a fill: scalar columns and relation payloads
/// side by side
#[derive(Debug, Default)]
pub struct FillAttributes {
    values: HashMap<String, FillValue>,
}

impl FillAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object
    pub fn from_json(value: Value) -> ModelResult<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                values: map
                    .into_iter()
                    .map(|(key, value)| (key, FillValue::Value(value)))
                    .collect(),
            }),
            other => Err(ModelError::Validation(format!(
                "Fill attributes must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Insert a value, returning the previous one
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FillValue>,
    ) -> Option<FillValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Builder form of `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FillValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<FillValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FillValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|key| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert to plain scalar attributes for mass assignment; records are
    /// only accepted under fillable relation names
    pub fn into_scalars(self) -> FillResult<Attributes> {
        self.values
            .into_iter()
            .map(|(key, value)| match value.into_json() {
                Some(json) => Ok((key, json)),
                None => Err(FillError::invalid_payload(
                    &key,
                    "records can only be passed for fillable relations",
                )),
            })
            .collect()
    }
}

impl From<Attributes> for FillAttributes {
    fn from(attributes: Attributes) -> Self {
        Self {
            values: attributes
                .into_iter()
                .map(|(key, value)| (key, FillValue::Value(value)))
                .collect(),
        }
    }
}
