//! In-Memory Relations - Relation handles over `MemoryDatabase` tables
//!
//! One handle type serves every relationship kind; the metadata decides
//! which columns it reads and writes.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{Attributes, FillRecord};
use crate::relationships::{
    BelongsToManyRelation, BelongsToRelation, ForeignKeyConfig, HasManyRelation, HasOneRelation,
    MorphManyRelation, MorphOneRelation, MorphToRelation, PivotConfig, PolymorphicConfig,
    RelatedQuery, Relation, RelationshipMetadata, RelationshipType,
};

use super::database::{MemoryDatabase, TableSchema};
use super::record::MemoryRecord;

/// Relation handle bound to a snapshot of its parent
#[derive(Debug, Clone)]
pub struct MemoryRelation {
    db: MemoryDatabase,
    metadata: RelationshipMetadata,
    parent_key: Option<Value>,
    parent_morph_class: String,
    parent_attributes: Attributes,
}

impl MemoryRelation {
    pub fn new(
        db: MemoryDatabase,
        metadata: RelationshipMetadata,
        parent: &dyn FillRecord,
    ) -> Self {
        let parent_key = parent
            .get_attribute(&metadata.local_key)
            .filter(|key| !key.is_null());

        Self {
            db,
            parent_key,
            parent_morph_class: parent.morph_class().to_string(),
            parent_attributes: parent.attributes(),
            metadata,
        }
    }

    pub fn metadata(&self) -> &RelationshipMetadata {
        &self.metadata
    }

    /// Wrap this handle in the `Relation` variant matching its metadata
    pub fn into_relation(self) -> Relation {
        match self.metadata.relationship_type {
            RelationshipType::BelongsTo => Relation::BelongsTo(Box::new(self)),
            RelationshipType::HasOne => Relation::HasOne(Box::new(self)),
            RelationshipType::HasMany => Relation::HasMany(Box::new(self)),
            RelationshipType::ManyToMany => Relation::BelongsToMany(Box::new(self)),
            RelationshipType::MorphTo => Relation::MorphTo(Box::new(self)),
            RelationshipType::MorphOne => Relation::MorphOne(Box::new(self)),
            RelationshipType::MorphMany => Relation::MorphMany(Box::new(self)),
            kind @ (RelationshipType::HasOneThrough | RelationshipType::HasManyThrough) => {
                Relation::ReadOnly(kind)
            }
        }
    }

    fn polymorphic(&self) -> ModelResult<&PolymorphicConfig> {
        self.metadata.polymorphic_config.as_ref().ok_or_else(|| {
            ModelError::Configuration(format!(
                "Relationship '{}' has no polymorphic configuration",
                self.metadata.name
            ))
        })
    }

    fn pivot(&self) -> ModelResult<&PivotConfig> {
        self.metadata.pivot_config.as_ref().ok_or_else(|| {
            ModelError::Configuration(format!(
                "Relationship '{}' has no pivot configuration",
                self.metadata.name
            ))
        })
    }

    fn required_parent_key(&self) -> ModelResult<Value> {
        self.parent_key.clone().ok_or(ModelError::MissingPrimaryKey)
    }

    /// Column on the related table (or owner, for belongs-to) holding the key
    fn foreign_column(&self) -> String {
        match self.metadata.polymorphic_config {
            Some(ref poly) => poly.id_column.clone(),
            None => self.metadata.foreign_key.primary_column().to_string(),
        }
    }

    /// Schema of the related table. For morph-to it is chosen by the morph
    /// type the parent currently stores, falling back to the first allowed type.
    fn related_schema(&self) -> ModelResult<TableSchema> {
        if self.metadata.relationship_type != RelationshipType::MorphTo {
            return self.db.schema(&self.metadata.related_table);
        }

        let poly = self.polymorphic()?;
        let morph_class = self
            .parent_attributes
            .get(&poly.type_column)
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .or_else(|| poly.allowed_types.first().cloned())
            .ok_or_else(|| {
                ModelError::Relationship(format!(
                    "Cannot resolve the related type of '{}': no morph type set",
                    self.metadata.name
                ))
            })?;

        self.db.schema_for_morph_class(&morph_class).ok_or_else(|| {
            ModelError::Schema(format!("No table is registered for morph class '{}'", morph_class))
        })
    }

    /// Columns selecting the records attached to the parent
    fn scope(&self) -> Option<Attributes> {
        let parent_key = self.parent_key.clone()?;
        let mut scope = Attributes::new();
        scope.insert(self.foreign_column(), parent_key);
        if let Some(ref poly) = self.metadata.polymorphic_config {
            scope.insert(poly.type_column.clone(), Value::String(self.parent_morph_class.clone()));
        }
        Some(scope)
    }

    fn boxed(record: Option<MemoryRecord>) -> Option<Box<dyn FillRecord>> {
        record.map(|record| Box::new(record) as Box<dyn FillRecord>)
    }
}

#[async_trait]
impl RelatedQuery for MemoryRelation {
    fn related_key_name(&self) -> String {
        self.related_schema()
            .map(|schema| schema.key_name)
            .unwrap_or_else(|_| "id".to_string())
    }

    fn new_related(&self, attributes: Attributes) -> ModelResult<Box<dyn FillRecord>> {
        let schema = self.related_schema()?;
        Ok(Box::new(self.db.make(&schema.name, attributes)?))
    }

    async fn find(&self, key: &Value) -> ModelResult<Option<Box<dyn FillRecord>>> {
        let schema = self.related_schema()?;
        Ok(Self::boxed(self.db.find(&schema.name, key)?))
    }

    async fn first_where(&self, filter: &Attributes) -> ModelResult<Option<Box<dyn FillRecord>>> {
        let schema = self.related_schema()?;
        Ok(Self::boxed(self.db.first_where(&schema.name, filter)?))
    }
}

impl BelongsToRelation for MemoryRelation {
    fn foreign_key_name(&self) -> String {
        self.foreign_column()
    }

    fn owner_key_name(&self) -> String {
        self.metadata.local_key.clone()
    }
}

#[async_trait]
impl HasOneRelation for MemoryRelation {
    fn foreign_key_name(&self) -> String {
        self.foreign_column()
    }

    fn parent_key(&self) -> Option<Value> {
        self.parent_key.clone()
    }

    async fn get_results(&self) -> ModelResult<Option<Box<dyn FillRecord>>> {
        let Some(scope) = self.scope() else {
            return Ok(None);
        };
        let schema = self.related_schema()?;
        Ok(Self::boxed(self.db.first_where(&schema.name, &scope)?))
    }
}

impl MorphOneRelation for MemoryRelation {
    fn morph_type(&self) -> String {
        self.polymorphic()
            .map(|poly| poly.type_column.clone())
            .unwrap_or_default()
    }

    fn morph_class(&self) -> String {
        self.parent_morph_class.clone()
    }
}

#[async_trait]
impl HasManyRelation for MemoryRelation {
    fn foreign_key_name(&self) -> String {
        self.foreign_column()
    }

    fn parent_key(&self) -> Option<Value> {
        self.parent_key.clone()
    }

    async fn save(&self, related: &mut dyn FillRecord) -> ModelResult<()> {
        related.set_attribute(&self.foreign_column(), self.required_parent_key()?);
        if let Some(ref poly) = self.metadata.polymorphic_config {
            let morph_class = Value::String(self.parent_morph_class.clone());
            related.set_attribute(&poly.type_column, morph_class);
        }
        related.save().await
    }

    async fn delete_all(&self) -> ModelResult<u64> {
        let Some(scope) = self.scope() else {
            return Ok(0);
        };
        let schema = self.related_schema()?;
        self.db.delete_where(&schema.name, &scope)
    }
}

impl MorphManyRelation for MemoryRelation {
    fn morph_type(&self) -> String {
        self.polymorphic()
            .map(|poly| poly.type_column.clone())
            .unwrap_or_default()
    }

    fn morph_class(&self) -> String {
        self.parent_morph_class.clone()
    }
}

#[async_trait]
impl BelongsToManyRelation for MemoryRelation {
    async fn detach_all(&self) -> ModelResult<u64> {
        let pivot = self.pivot()?;
        let mut filter = Attributes::new();
        filter.insert(pivot.local_key.clone(), self.required_parent_key()?);
        Ok(self.db.detach_where(&pivot.table, &filter))
    }

    async fn attach(&self, related: &dyn FillRecord, columns: Attributes) -> ModelResult<()> {
        let pivot = self.pivot()?;
        let related_key = related.key().ok_or(ModelError::MissingPrimaryKey)?;

        let mut row = columns;
        row.insert(pivot.local_key.clone(), self.required_parent_key()?);
        row.insert(pivot.foreign_key.clone(), related_key);
        if pivot.with_timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            row.insert("created_at".to_string(), now.clone());
            row.insert("updated_at".to_string(), now);
        }

        self.db.attach(&pivot.table, row);
        Ok(())
    }
}

#[async_trait]
impl MorphToRelation for MemoryRelation {
    async fn get_results(&self) -> ModelResult<Option<Box<dyn FillRecord>>> {
        let poly = self.polymorphic()?;
        let has_type = self
            .parent_attributes
            .get(&poly.type_column)
            .map(|value| value.is_string())
            .unwrap_or(false);
        let key = self
            .parent_attributes
            .get(&poly.id_column)
            .filter(|key| !key.is_null());

        match (has_type, key) {
            (true, Some(key)) => {
                let schema = self.related_schema()?;
                Ok(Self::boxed(self.db.find(&schema.name, key)?))
            }
            _ => Ok(None),
        }
    }

    fn accepts(&self, morph_class: &str) -> bool {
        self.polymorphic()
            .map(|poly| poly.allows(morph_class))
            .unwrap_or(false)
    }

    fn associate(&self, owner: &mut dyn FillRecord, related: &dyn FillRecord) -> ModelResult<()> {
        let poly = self.polymorphic()?;
        let morph_class = related.morph_class();
        if !poly.allows(morph_class) {
            return Err(ModelError::Relationship(format!(
                "Relationship '{}' does not accept '{}' records",
                self.metadata.name, morph_class
            )));
        }

        let key = related.key().ok_or(ModelError::MissingPrimaryKey)?;
        owner.set_attribute(&poly.id_column, key);
        owner.set_attribute(&poly.type_column, Value::String(morph_class.to_string()));
        Ok(())
    }
}

/// Relation builders following the `{table}_id` / `{name}_type` conventions
impl MemoryRecord {
    /// Handle for arbitrary metadata, validated first
    pub fn relation(&self, metadata: RelationshipMetadata) -> ModelResult<Relation> {
        metadata.validate()?;
        Ok(self.handle(metadata))
    }

    fn handle(&self, metadata: RelationshipMetadata) -> Relation {
        MemoryRelation::new(self.database().clone(), metadata, self).into_relation()
    }

    pub fn belongs_to(&self, name: &str, related_table: &str, foreign_key: &str) -> Relation {
        self.handle(RelationshipMetadata::new(
            RelationshipType::BelongsTo,
            name.to_string(),
            related_table.to_string(),
            ForeignKeyConfig::simple(foreign_key.to_string(), self.table().to_string()),
        ))
    }

    pub fn has_one(&self, name: &str, related_table: &str, foreign_key: &str) -> Relation {
        self.handle(
            RelationshipMetadata::new(
                RelationshipType::HasOne,
                name.to_string(),
                related_table.to_string(),
                ForeignKeyConfig::simple(foreign_key.to_string(), related_table.to_string()),
            )
            .with_local_key(self.key_name().to_string()),
        )
    }

    pub fn has_many(&self, name: &str, related_table: &str, foreign_key: &str) -> Relation {
        self.handle(
            RelationshipMetadata::new(
                RelationshipType::HasMany,
                name.to_string(),
                related_table.to_string(),
                ForeignKeyConfig::simple(foreign_key.to_string(), related_table.to_string()),
            )
            .with_local_key(self.key_name().to_string()),
        )
    }

    pub fn belongs_to_many(&self, name: &str, related_table: &str, pivot: PivotConfig) -> Relation {
        self.handle(
            RelationshipMetadata::new(
                RelationshipType::ManyToMany,
                name.to_string(),
                related_table.to_string(),
                ForeignKeyConfig::simple(pivot.foreign_key.clone(), pivot.table.clone()),
            )
            .with_local_key(self.key_name().to_string())
            .with_pivot(pivot),
        )
    }

    pub fn morph_one(&self, name: &str, related_table: &str, morph_name: &str) -> Relation {
        self.morph_relation(RelationshipType::MorphOne, name, related_table, morph_name)
    }

    pub fn morph_many(&self, name: &str, related_table: &str, morph_name: &str) -> Relation {
        self.morph_relation(RelationshipType::MorphMany, name, related_table, morph_name)
    }

    /// Inverse polymorphic handle; `allowed` restricts the accepted morph
    /// classes, the first one doubling as the type for newly created records
    pub fn morph_to(&self, morph_name: &str, allowed: &[&str]) -> Relation {
        let poly = PolymorphicConfig::conventional(morph_name)
            .with_allowed_types(allowed.iter().map(|t| t.to_string()).collect());

        self.handle(
            RelationshipMetadata::new(
                RelationshipType::MorphTo,
                morph_name.to_string(),
                String::new(),
                ForeignKeyConfig::simple(poly.id_column.clone(), self.table().to_string()),
            )
            .with_polymorphic(poly),
        )
    }

    pub fn has_many_through(&self, name: &str, related_table: &str, foreign_key: &str) -> Relation {
        self.handle(RelationshipMetadata::new(
            RelationshipType::HasManyThrough,
            name.to_string(),
            related_table.to_string(),
            ForeignKeyConfig::simple(foreign_key.to_string(), related_table.to_string()),
        ))
    }

    fn morph_relation(
        &self,
        kind: RelationshipType,
        name: &str,
        related_table: &str,
        morph_name: &str,
    ) -> Relation {
        let poly = PolymorphicConfig::conventional(morph_name);
        self.handle(
            RelationshipMetadata::new(
                kind,
                name.to_string(),
                related_table.to_string(),
                ForeignKeyConfig::simple(poly.id_column.clone(), related_table.to_string()),
            )
            .with_local_key(self.key_name().to_string())
            .with_polymorphic(poly),
        )
    }
}
