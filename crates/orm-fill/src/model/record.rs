//! Record Trait - Dynamic view of a model instance used by the fill engine
//!
//! Related records of different types travel through the same relation
//! handles, so the engine works on `dyn FillRecord` rather than a concrete
//! model type.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ModelResult;

/// Field-value pairs, the same shape models expose through `to_fields`
pub type Attributes = HashMap<String, Value>;

/// A single persisted (or to-be-persisted) model instance
#[async_trait]
pub trait FillRecord: Send + Sync + Debug {
    /// Primary key field name
    fn key_name(&self) -> &str {
        "id"
    }

    /// Current primary key value, `None` until one is assigned
    fn key(&self) -> Option<Value> {
        self.get_attribute(self.key_name())
            .filter(|value| !value.is_null())
    }

    /// Whether this instance has been persisted
    fn exists(&self) -> bool;

    /// Discriminator stored in morph type columns when this record is the
    /// target of a polymorphic relationship
    fn morph_class(&self) -> &str;

    /// Get a single attribute value
    fn get_attribute(&self, key: &str) -> Option<Value>;

    /// Set a single attribute value in memory
    fn set_attribute(&mut self, key: &str, value: Value);

    /// All current attribute values
    fn attributes(&self) -> Attributes;

    /// Mass-assign scalar attributes in memory
    fn fill(&mut self, attributes: Attributes) -> ModelResult<()> {
        for (key, value) in attributes {
            self.set_attribute(&key, value);
        }
        Ok(())
    }

    /// Insert or update this instance
    async fn save(&mut self) -> ModelResult<()>;

    /// Fill and save in one step
    async fn update(&mut self, attributes: Attributes) -> ModelResult<()> {
        self.fill(attributes)?;
        self.save().await
    }
}

/// Render a key value the way it is compared and displayed
pub(crate) fn key_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Loose key equality: `3` and `"3"` name the same record
pub fn keys_match(left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    left == right || key_to_string(left) == key_to_string(right)
}
