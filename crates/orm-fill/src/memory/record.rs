//! In-Memory Records - Dynamic rows usable as owners and related records

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{Attributes, FillRecord};

use super::database::{MemoryDatabase, TableSchema};

/// A row of a `MemoryDatabase` table
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    db: MemoryDatabase,
    table: String,
    key_name: String,
    morph_class: String,
    attributes: Attributes,
    exists: bool,
}

impl MemoryRecord {
    pub(crate) fn from_parts(
        db: MemoryDatabase,
        schema: &TableSchema,
        attributes: Attributes,
        exists: bool,
    ) -> Self {
        Self {
            db,
            table: schema.name.clone(),
            key_name: schema.key_name.clone(),
            morph_class: schema.morph_class.clone(),
            attributes,
            exists,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    /// Borrow a single attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Reload attributes from the table, e.g. after related writes
    pub fn refresh(&mut self) -> ModelResult<()> {
        let key = self
            .attributes
            .get(&self.key_name)
            .cloned()
            .ok_or(ModelError::MissingPrimaryKey)?;
        let fresh = self
            .db
            .find(&self.table, &key)?
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", self.table, key)))?;
        self.attributes = fresh.attributes;
        Ok(())
    }

    fn persist(&mut self) -> ModelResult<()> {
        let stored = if self.exists {
            let key = self
                .attributes
                .get(&self.key_name)
                .filter(|key| !key.is_null())
                .cloned()
                .ok_or(ModelError::MissingPrimaryKey)?;
            self.db.update(&self.table, &key, self.attributes.clone())?
        } else {
            self.db.insert(&self.table, self.attributes.clone())?
        };

        self.attributes = stored;
        self.exists = true;
        Ok(())
    }
}

/// Typed models backed by a `MemoryRecord` get `FillRecord` for free
pub trait MemoryModel: Send + Sync + Debug {
    fn record(&self) -> &MemoryRecord;

    fn record_mut(&mut self) -> &mut MemoryRecord;
}

impl MemoryModel for MemoryRecord {
    fn record(&self) -> &MemoryRecord {
        self
    }

    fn record_mut(&mut self) -> &mut MemoryRecord {
        self
    }
}

#[async_trait]
impl<T: MemoryModel> FillRecord for T {
    fn key_name(&self) -> &str {
        &self.record().key_name
    }

    fn exists(&self) -> bool {
        self.record().exists
    }

    fn morph_class(&self) -> &str {
        &self.record().morph_class
    }

    fn get_attribute(&self, key: &str) -> Option<Value> {
        self.record().attributes.get(key).cloned()
    }

    fn set_attribute(&mut self, key: &str, value: Value) {
        self.record_mut().attributes.insert(key.to_string(), value);
    }

    fn attributes(&self) -> Attributes {
        self.record().attributes.clone()
    }

    async fn save(&mut self) -> ModelResult<()> {
        self.record_mut().persist()
    }
}
