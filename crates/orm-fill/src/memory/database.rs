//! In-Memory Database - Tables, pivot tables and a write journal

use std::sync::{Arc, Mutex};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::model::{keys_match, Attributes};

use super::record::MemoryRecord;

/// How a table assigns primary keys to inserted rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Sequential integers starting at 1
    #[default]
    Increment,
    /// Random UUID v4 strings
    Uuid,
}

/// Table definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub key_name: String,
    pub key_strategy: KeyStrategy,
    /// Maintain `created_at` / `updated_at` columns
    pub timestamps: bool,
    /// Value stored in morph type columns for rows of this table
    pub morph_class: String,
}

impl TableSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key_name: "id".to_string(),
            key_strategy: KeyStrategy::Increment,
            timestamps: false,
            morph_class: name.to_string(),
        }
    }

    pub fn with_key_name(mut self, key_name: &str) -> Self {
        self.key_name = key_name.to_string();
        self
    }

    pub fn with_uuid_keys(mut self) -> Self {
        self.key_strategy = KeyStrategy::Uuid;
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn with_morph_class(mut self, morph_class: &str) -> Self {
        self.morph_class = morph_class.to_string();
        self
    }
}

/// A write performed against the database, in execution order
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert { table: String, key: Value },
    Update { table: String, key: Value },
    Delete { table: String, key: Value },
    Attach { table: String, row: Attributes },
    Detach { table: String, row: Attributes },
}

impl Operation {
    /// Table the operation wrote to
    pub fn table(&self) -> &str {
        match self {
            Operation::Insert { table, .. }
            | Operation::Update { table, .. }
            | Operation::Delete { table, .. }
            | Operation::Attach { table, .. }
            | Operation::Detach { table, .. } => table,
        }
    }
}

#[derive(Debug)]
struct Table {
    schema: TableSchema,
    next_id: i64,
    rows: Vec<Attributes>,
}

#[derive(Debug, Default)]
struct DatabaseInner {
    tables: DashMap<String, Table>,
    pivots: DashMap<String, Vec<Attributes>>,
    journal: Mutex<Vec<Operation>>,
}

/// Shared in-process database; clones refer to the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<DatabaseInner>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine, dropping its rows) a table
    pub fn define_table(&self, schema: TableSchema) -> &Self {
        self.inner.tables.insert(
            schema.name.clone(),
            Table {
                schema,
                next_id: 1,
                rows: Vec::new(),
            },
        );
        self
    }

    /// Schema of a defined table
    pub fn schema(&self, table: &str) -> ModelResult<TableSchema> {
        self.inner
            .tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| undefined_table(table))
    }

    /// Schema of the table whose rows carry `morph_class`
    pub fn schema_for_morph_class(&self, morph_class: &str) -> Option<TableSchema> {
        self.inner
            .tables
            .iter()
            .find(|entry| entry.schema.morph_class == morph_class)
            .map(|entry| entry.schema.clone())
    }

    /// Instantiate an unsaved record for `table`
    pub fn make(&self, table: &str, attributes: Attributes) -> ModelResult<MemoryRecord> {
        let schema = self.schema(table)?;
        Ok(MemoryRecord::from_parts(self.clone(), &schema, attributes, false))
    }

    /// Instantiate and insert a record
    pub fn create(&self, table: &str, attributes: Attributes) -> ModelResult<MemoryRecord> {
        let schema = self.schema(table)?;
        let row = self.insert(table, attributes)?;
        Ok(MemoryRecord::from_parts(self.clone(), &schema, row, true))
    }

    /// Find a record by primary key
    pub fn find(&self, table: &str, key: &Value) -> ModelResult<Option<MemoryRecord>> {
        let entry = self.inner.tables.get(table).ok_or_else(|| undefined_table(table))?;
        let key_name = &entry.schema.key_name;

        Ok(entry
            .rows
            .iter()
            .find(|row| row.get(key_name).map(|k| keys_match(k, key)).unwrap_or(false))
            .map(|row| MemoryRecord::from_parts(self.clone(), &entry.schema, row.clone(), true)))
    }

    /// All records matching every column of `filter`, in insertion order
    pub fn where_eq(&self, table: &str, filter: &Attributes) -> ModelResult<Vec<MemoryRecord>> {
        let entry = self.inner.tables.get(table).ok_or_else(|| undefined_table(table))?;
        let key_name = entry.schema.key_name.as_str();

        Ok(entry
            .rows
            .iter()
            .filter(|row| row_matches(row, filter, Some(key_name)))
            .map(|row| MemoryRecord::from_parts(self.clone(), &entry.schema, row.clone(), true))
            .collect())
    }

    /// First record matching every column of `filter`
    pub fn first_where(
        &self,
        table: &str,
        filter: &Attributes,
    ) -> ModelResult<Option<MemoryRecord>> {
        Ok(self.where_eq(table, filter)?.into_iter().next())
    }

    /// Raw rows of a table
    pub fn rows(&self, table: &str) -> Vec<Attributes> {
        self.inner
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, table: &str) -> usize {
        self.inner.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Insert a row, assigning its key and timestamps; returns the stored row
    pub(crate) fn insert(
        &self,
        table: &str,
        mut attributes: Attributes,
    ) -> ModelResult<Attributes> {
        let mut entry = self.inner.tables.get_mut(table).ok_or_else(|| undefined_table(table))?;
        let key_name = entry.schema.key_name.clone();
        let strategy = entry.schema.key_strategy;

        let key = match attributes.get(&key_name).filter(|k| !k.is_null()).cloned() {
            Some(key) => {
                let taken = entry
                    .rows
                    .iter()
                    .any(|row| row.get(&key_name).map(|k| keys_match(k, &key)).unwrap_or(false));
                if taken {
                    return Err(ModelError::Database(format!(
                        "Duplicate key {} for table '{}'",
                        key, table
                    )));
                }
                if strategy == KeyStrategy::Increment {
                    if let Some(id) = integer_key(&key) {
                        let next = id.checked_add(1).ok_or_else(|| {
                            ModelError::Database(format!(
                                "Key {} exhausts the key sequence of table '{}'",
                                key, table
                            ))
                        })?;
                        entry.next_id = entry.next_id.max(next);
                    }
                }
                key
            }
            None => match strategy {
                KeyStrategy::Increment => {
                    let id = entry.next_id;
                    entry.next_id += 1;
                    Value::from(id)
                }
                KeyStrategy::Uuid => Value::String(Uuid::new_v4().to_string()),
            },
        };

        attributes.insert(key_name, key.clone());
        if entry.schema.timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            attributes.insert("created_at".to_string(), now.clone());
            attributes.insert("updated_at".to_string(), now);
        }

        entry.rows.push(attributes.clone());
        drop(entry);

        self.record(Operation::Insert {
            table: table.to_string(),
            key,
        });
        Ok(attributes)
    }

    /// Replace the row identified by `key`; returns the stored row
    pub(crate) fn update(
        &self,
        table: &str,
        key: &Value,
        mut attributes: Attributes,
    ) -> ModelResult<Attributes> {
        let mut entry = self.inner.tables.get_mut(table).ok_or_else(|| undefined_table(table))?;
        let key_name = entry.schema.key_name.clone();
        let timestamps = entry.schema.timestamps;

        let row = entry
            .rows
            .iter_mut()
            .find(|row| row.get(&key_name).map(|k| keys_match(k, key)).unwrap_or(false))
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", table, key)))?;

        attributes.insert(key_name, key.clone());
        if timestamps {
            attributes.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        *row = attributes.clone();
        drop(entry);

        self.record(Operation::Update {
            table: table.to_string(),
            key: key.clone(),
        });
        Ok(attributes)
    }

    /// Delete every row matching `filter`; returns the number deleted
    pub(crate) fn delete_where(&self, table: &str, filter: &Attributes) -> ModelResult<u64> {
        let mut entry = self.inner.tables.get_mut(table).ok_or_else(|| undefined_table(table))?;
        let key_name = entry.schema.key_name.clone();

        let (deleted, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut entry.rows)
            .into_iter()
            .partition(|row| row_matches(row, filter, Some(key_name.as_str())));
        entry.rows = kept;
        drop(entry);

        for row in &deleted {
            self.record(Operation::Delete {
                table: table.to_string(),
                key: row.get(&key_name).cloned().unwrap_or(Value::Null),
            });
        }
        Ok(deleted.len() as u64)
    }

    /// Rows of a pivot table
    pub fn pivot_rows(&self, table: &str) -> Vec<Attributes> {
        self.inner
            .pivots
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    pub(crate) fn attach(&self, table: &str, row: Attributes) {
        self.inner
            .pivots
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        self.record(Operation::Attach {
            table: table.to_string(),
            row,
        });
    }

    /// Remove every pivot row matching `filter`; returns the number removed
    pub(crate) fn detach_where(&self, table: &str, filter: &Attributes) -> u64 {
        let removed: Vec<Attributes> = match self.inner.pivots.get_mut(table) {
            Some(mut rows) => {
                let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *rows)
                    .into_iter()
                    .partition(|row| row_matches(row, filter, None));
                *rows = kept;
                removed
            }
            None => Vec::new(),
        };

        for row in &removed {
            self.record(Operation::Detach {
                table: table.to_string(),
                row: row.clone(),
            });
        }
        removed.len() as u64
    }

    /// Every write so far, oldest first
    pub fn journal(&self) -> Vec<Operation> {
        self.inner
            .journal
            .lock()
            .map(|journal| journal.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn clear_journal(&self) {
        match self.inner.journal.lock() {
            Ok(mut journal) => journal.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn record(&self, operation: Operation) {
        match self.inner.journal.lock() {
            Ok(mut journal) => journal.push(operation),
            Err(poisoned) => poisoned.into_inner().push(operation),
        }
    }
}

fn undefined_table(table: &str) -> ModelError {
    ModelError::Schema(format!("Table '{}' is not defined", table))
}

/// Integer value of an explicit key, including numeric strings from form input
fn integer_key(key: &Value) -> Option<i64> {
    key.as_i64()
        .or_else(|| key.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
}

/// Exact-match filter; a null filter value matches a null or absent column.
/// Only the primary key column compares loosely.
fn row_matches(row: &Attributes, filter: &Attributes, key_name: Option<&str>) -> bool {
    filter.iter().all(|(column, expected)| match (row.get(column), expected) {
        (None, Value::Null) | (Some(Value::Null), Value::Null) => true,
        (Some(actual), expected) if Some(column.as_str()) == key_name => {
            keys_match(actual, expected)
        }
        (Some(actual), expected) => actual == expected,
        (None, _) => false,
    })
}
