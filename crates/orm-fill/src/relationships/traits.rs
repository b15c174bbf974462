//! Relationship Traits - Capabilities the fill engine needs from relation handles
//!
//! A handle is obtained from a model's relation accessor and describes one
//! association. It captures the parent's key when it is acquired, so a
//! handle taken from an unsaved parent must be re-acquired after saving.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ModelResult;
use crate::model::{Attributes, FillRecord};

use super::metadata::RelationshipType;

/// Access to the related model's table, shared by every relation kind
#[async_trait]
pub trait RelatedQuery: Send + Sync {
    /// Primary key field name of the related model
    fn related_key_name(&self) -> String;

    /// Instantiate an unsaved related record filled with `attributes`
    fn new_related(&self, attributes: Attributes) -> ModelResult<Box<dyn FillRecord>>;

    /// Find a related record by primary key
    async fn find(&self, key: &Value) -> ModelResult<Option<Box<dyn FillRecord>>>;

    /// First related record whose columns equal every entry of `filter`
    async fn first_where(&self, filter: &Attributes) -> ModelResult<Option<Box<dyn FillRecord>>>;

    /// Instantiate and persist a related record
    async fn create(&self, attributes: Attributes) -> ModelResult<Box<dyn FillRecord>> {
        let mut record = self.new_related(attributes)?;
        record.save().await?;
        Ok(record)
    }
}

/// Child-to-parent relation: the owner holds the foreign key
pub trait BelongsToRelation: RelatedQuery {
    /// Foreign key column on the owner
    fn foreign_key_name(&self) -> String;

    /// Key on the related model the foreign key points at
    fn owner_key_name(&self) -> String {
        self.related_key_name()
    }

    /// Point the owner at `related` (in memory only)
    fn associate(&self, owner: &mut dyn FillRecord, related: &dyn FillRecord) -> ModelResult<()> {
        let value = related
            .get_attribute(&self.owner_key_name())
            .unwrap_or(Value::Null);
        owner.set_attribute(&self.foreign_key_name(), value);
        Ok(())
    }
}

/// Parent-to-single-child relation: the related record holds the foreign key
#[async_trait]
pub trait HasOneRelation: RelatedQuery {
    /// Foreign key column on the related model
    fn foreign_key_name(&self) -> String;

    /// Parent key captured when the handle was acquired
    fn parent_key(&self) -> Option<Value>;

    /// The related record currently attached to the parent, if any
    async fn get_results(&self) -> ModelResult<Option<Box<dyn FillRecord>>>;
}

/// Polymorphic parent-to-single-child relation
pub trait MorphOneRelation: HasOneRelation {
    /// Morph type column on the related model
    fn morph_type(&self) -> String;

    /// Value the parent stores in the morph type column
    fn morph_class(&self) -> String;
}

/// Parent-to-children relation: the related records hold the foreign key
#[async_trait]
pub trait HasManyRelation: RelatedQuery {
    /// Foreign key column on the related model
    fn foreign_key_name(&self) -> String;

    /// Parent key captured when the handle was acquired
    fn parent_key(&self) -> Option<Value>;

    /// Attach `related` to the parent and persist it
    async fn save(&self, related: &mut dyn FillRecord) -> ModelResult<()>;

    /// Delete every record currently attached to the parent
    async fn delete_all(&self) -> ModelResult<u64>;
}

/// Polymorphic parent-to-children relation
pub trait MorphManyRelation: HasManyRelation {
    /// Morph type column on the related model
    fn morph_type(&self) -> String;

    /// Value the parent stores in the morph type column
    fn morph_class(&self) -> String;
}

/// Many-to-many relation through a pivot table
#[async_trait]
pub trait BelongsToManyRelation: RelatedQuery {
    /// Remove every pivot row linking the parent
    async fn detach_all(&self) -> ModelResult<u64>;

    /// Link `related` to the parent with extra pivot columns
    async fn attach(&self, related: &dyn FillRecord, pivot: Attributes) -> ModelResult<()>;
}

/// Inverse polymorphic relation: the owner holds morph type and id
#[async_trait]
pub trait MorphToRelation: RelatedQuery {
    /// The record the owner currently points at, if any
    async fn get_results(&self) -> ModelResult<Option<Box<dyn FillRecord>>>;

    /// Whether records of `morph_class` may be associated
    fn accepts(&self, _morph_class: &str) -> bool {
        true
    }

    /// Point the owner at `related` (in memory only)
    fn associate(&self, owner: &mut dyn FillRecord, related: &dyn FillRecord) -> ModelResult<()>;
}

/// A resolved relation handle, one variant per relationship kind
pub enum Relation {
    BelongsTo(Box<dyn BelongsToRelation>),
    HasOne(Box<dyn HasOneRelation>),
    HasMany(Box<dyn HasManyRelation>),
    BelongsToMany(Box<dyn BelongsToManyRelation>),
    MorphTo(Box<dyn MorphToRelation>),
    MorphOne(Box<dyn MorphOneRelation>),
    MorphMany(Box<dyn MorphManyRelation>),
    /// Relations that can be read but not written through (through-relations)
    ReadOnly(RelationshipType),
}

impl Relation {
    /// The relationship kind of this handle
    pub fn kind(&self) -> RelationshipType {
        match self {
            Relation::BelongsTo(_) => RelationshipType::BelongsTo,
            Relation::HasOne(_) => RelationshipType::HasOne,
            Relation::HasMany(_) => RelationshipType::HasMany,
            Relation::BelongsToMany(_) => RelationshipType::ManyToMany,
            Relation::MorphTo(_) => RelationshipType::MorphTo,
            Relation::MorphOne(_) => RelationshipType::MorphOne,
            Relation::MorphMany(_) => RelationshipType::MorphMany,
            Relation::ReadOnly(kind) => *kind,
        }
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Relation").field(&self.kind()).finish()
    }
}
