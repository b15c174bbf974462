//! Relationship Metadata System - Core metadata definitions for relationships

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-one relationship (hasOne)
    HasOne,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-one relationship (belongsTo)
    BelongsTo,
    /// Many-to-many relationship through a pivot table
    ManyToMany,
    /// Polymorphic one-to-one relationship
    MorphOne,
    /// Polymorphic one-to-many relationship
    MorphMany,
    /// Inverse polymorphic relationship
    MorphTo,
    /// One-to-one relationship reached through an intermediate model
    HasOneThrough,
    /// One-to-many relationship reached through an intermediate model
    HasManyThrough,
}

impl RelationshipType {
    /// Returns true if this relationship type is polymorphic
    pub fn is_polymorphic(self) -> bool {
        matches!(self, Self::MorphOne | Self::MorphMany | Self::MorphTo)
    }

    /// Returns true if this relationship requires a pivot table
    pub fn requires_pivot(self) -> bool {
        matches!(self, Self::ManyToMany)
    }

    /// Returns true if the related side stores a key pointing back at the
    /// parent, so the parent must be persisted before related records are
    /// written
    pub fn requires_persisted_parent(self) -> bool {
        matches!(
            self,
            Self::HasOne | Self::HasMany | Self::ManyToMany | Self::MorphOne | Self::MorphMany
        )
    }
}

/// Relationship metadata describing how two tables are linked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// The type of relationship
    pub relationship_type: RelationshipType,

    /// Name of the relationship (accessor name on the model)
    pub name: String,

    /// The related model's table name
    pub related_table: String,

    /// Foreign key configuration
    pub foreign_key: ForeignKeyConfig,

    /// Key the foreign key points at (parent key for has-one/has-many,
    /// related key for belongs-to); defaults to "id"
    pub local_key: String,

    /// Pivot table configuration for many-to-many relationships
    pub pivot_config: Option<PivotConfig>,

    /// Polymorphic configuration
    pub polymorphic_config: Option<PolymorphicConfig>,
}

impl RelationshipMetadata {
    /// Create a new RelationshipMetadata instance
    pub fn new(
        relationship_type: RelationshipType,
        name: String,
        related_table: String,
        foreign_key: ForeignKeyConfig,
    ) -> Self {
        Self {
            relationship_type,
            name,
            related_table,
            foreign_key,
            local_key: "id".to_string(),
            pivot_config: None,
            polymorphic_config: None,
        }
    }

    /// Set the local key
    pub fn with_local_key(mut self, local_key: String) -> Self {
        self.local_key = local_key;
        self
    }

    /// Set pivot table configuration
    pub fn with_pivot(mut self, pivot_config: PivotConfig) -> Self {
        self.pivot_config = Some(pivot_config);
        self
    }

    /// Set polymorphic configuration
    pub fn with_polymorphic(mut self, polymorphic_config: PolymorphicConfig) -> Self {
        self.polymorphic_config = Some(polymorphic_config);
        self
    }

    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.relationship_type.requires_pivot() && self.pivot_config.is_none() {
            return Err(ModelError::Configuration(
                format!("Relationship '{}' of type {:?} requires pivot configuration",
                        self.name, self.relationship_type)
            ));
        }

        if self.relationship_type.is_polymorphic() && self.polymorphic_config.is_none() {
            return Err(ModelError::Configuration(
                format!("Relationship '{}' of type {:?} requires polymorphic configuration",
                        self.name, self.relationship_type)
            ));
        }

        // Polymorphic relationships key through the morph id column instead
        if !self.relationship_type.is_polymorphic() {
            self.foreign_key.validate()?;
        }

        if let Some(ref pivot) = self.pivot_config {
            pivot.validate()?;
        }

        if let Some(ref poly) = self.polymorphic_config {
            poly.validate()?;
        }

        Ok(())
    }
}

/// Foreign key configuration for relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// The foreign key column name(s)
    pub columns: Vec<String>,

    /// Whether this is a composite foreign key
    pub is_composite: bool,

    /// The table where the foreign key is located
    pub table: String,
}

impl ForeignKeyConfig {
    /// Create a simple foreign key configuration
    pub fn simple(column: String, table: String) -> Self {
        Self {
            columns: vec![column],
            is_composite: false,
            table,
        }
    }

    /// Get the primary foreign key column (first in composite keys)
    pub fn primary_column(&self) -> &str {
        self.columns.first().map(|s| s.as_str()).unwrap_or("")
    }

    /// Validate the foreign key configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.columns.is_empty() {
            return Err(ModelError::Configuration(
                "Foreign key configuration must have at least one column".to_string()
            ));
        }

        if self.is_composite {
            return Err(ModelError::Configuration(
                "Composite foreign keys cannot be filled through nested attributes".to_string()
            ));
        }

        if self.table.is_empty() {
            return Err(ModelError::Configuration(
                "Foreign key configuration must specify a table".to_string()
            ));
        }

        Ok(())
    }
}

/// Pivot table configuration for many-to-many relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// The pivot table name
    pub table: String,

    /// The foreign key column for the local model in the pivot table
    pub local_key: String,

    /// The foreign key column for the related model in the pivot table
    pub foreign_key: String,

    /// Timestamps configuration for the pivot table
    pub with_timestamps: bool,
}

impl PivotConfig {
    /// Create a new pivot configuration
    pub fn new(table: String, local_key: String, foreign_key: String) -> Self {
        Self {
            table,
            local_key,
            foreign_key,
            with_timestamps: false,
        }
    }

    /// Enable timestamp columns on the pivot table
    pub fn with_timestamps(mut self) -> Self {
        self.with_timestamps = true;
        self
    }

    /// Validate the pivot configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.table.is_empty() {
            return Err(ModelError::Configuration(
                "Pivot table name cannot be empty".to_string()
            ));
        }

        if self.local_key.is_empty() {
            return Err(ModelError::Configuration(
                "Pivot local key cannot be empty".to_string()
            ));
        }

        if self.foreign_key.is_empty() {
            return Err(ModelError::Configuration(
                "Pivot foreign key cannot be empty".to_string()
            ));
        }

        if self.local_key == self.foreign_key {
            return Err(ModelError::Configuration(
                "Pivot local key and foreign key must be different".to_string()
            ));
        }

        Ok(())
    }
}

/// Polymorphic relationship configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicConfig {
    /// The morph type column name (stores the model type)
    pub type_column: String,

    /// The morph id column name (stores the foreign key)
    pub id_column: String,

    /// The name/namespace for this polymorphic relationship
    pub name: String,

    /// Allowed types for this polymorphic relationship
    pub allowed_types: Vec<String>,
}

impl PolymorphicConfig {
    /// Create a new polymorphic configuration
    pub fn new(name: String, type_column: String, id_column: String) -> Self {
        Self {
            type_column,
            id_column,
            name,
            allowed_types: Vec::new(),
        }
    }

    /// Create a configuration using the `{name}_type` / `{name}_id` convention
    pub fn conventional(name: &str) -> Self {
        Self::new(name.to_string(), format!("{}_type", name), format!("{}_id", name))
    }

    /// Set allowed types for the polymorphic relationship
    pub fn with_allowed_types(mut self, types: Vec<String>) -> Self {
        self.allowed_types = types;
        self
    }

    /// Check whether a morph class may be stored in this relationship
    pub fn allows(&self, morph_class: &str) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.iter().any(|t| t == morph_class)
    }

    /// Validate the polymorphic configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic relationship name cannot be empty".to_string()
            ));
        }

        if self.type_column.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic type column cannot be empty".to_string()
            ));
        }

        if self.id_column.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic ID column cannot be empty".to_string()
            ));
        }

        if self.type_column == self.id_column {
            return Err(ModelError::Configuration(
                "Polymorphic type column and ID column must be different".to_string()
            ));
        }

        Ok(())
    }
}
