//! Relation Fill Engine - Entry points and relation dispatch
//!
//! Strategies for the individual relation kinds live in sibling modules as
//! further `impl RelationFiller` blocks.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{FillConfig, MissingRelatedPolicy};
use crate::error::{FillError, FillResult};
use crate::model::record::key_to_string;
use crate::model::{FillRecord, FillableModel};
use crate::relationships::{RelatedQuery, Relation, RelationshipType};

use super::extractor::{extract_fillable, RelationPayloads};
use super::payload::FillAttributes;

/// Fills models and their relations from nested attribute maps
#[derive(Debug, Clone, Default)]
pub struct RelationFiller {
    config: FillConfig,
}

impl RelationFiller {
    pub fn new(config: FillConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Fill `owner` from `attributes`.
    ///
    /// Scalars go through the model's own mass assignment, then each
    /// fillable relation present in the input is filled in declared order.
    /// The owner itself is only saved when a dependent relation needs its
    /// key.
    pub async fn fill<M: FillableModel>(
        &self,
        owner: &mut M,
        attributes: FillAttributes,
    ) -> FillResult<()> {
        let (relations, scalars) = extract_fillable(attributes, M::fillable_relations());
        debug!(
            "Filling model with {} scalar attribute(s) and {} relation(s)",
            scalars.len(),
            relations.len()
        );

        owner.fill(scalars.into_scalars()?)?;
        self.fill_relations(owner, relations).await
    }

    /// Build a new instance from `prototype`, fill it and save it
    pub async fn create<M: FillableModel>(
        &self,
        prototype: &M,
        attributes: FillAttributes,
    ) -> FillResult<M> {
        let mut model = prototype.new_instance();
        self.fill(&mut model, attributes).await?;
        model.save().await?;
        Ok(model)
    }

    /// Fill every relation payload on `owner`, stopping at the first error.
    ///
    /// Relations filled before a failure stay written.
    pub async fn fill_relations<M: FillableModel>(
        &self,
        owner: &mut M,
        relations: RelationPayloads,
    ) -> FillResult<()> {
        for (name, payload) in relations {
            let relation = M::relations()
                .resolve(owner, &name)
                .ok_or_else(|| FillError::MissingAccessor {
                    relation: name.clone(),
                })?;

            debug!("Filling relation '{}' ({:?})", name, relation.kind());

            match relation {
                Relation::BelongsTo(handle) => {
                    self.fill_belongs_to(&mut *owner, handle, payload, &name).await?
                }
                Relation::HasOne(handle) => {
                    self.fill_has_one(owner, handle, payload, &name).await?
                }
                Relation::HasMany(handle) => {
                    self.fill_has_many(owner, handle, payload, &name).await?
                }
                Relation::BelongsToMany(handle) => {
                    self.fill_belongs_to_many(owner, handle, payload, &name).await?
                }
                Relation::MorphTo(handle) => {
                    self.fill_morph_to(&mut *owner, handle, payload, &name).await?
                }
                Relation::MorphOne(handle) => {
                    self.fill_morph_one(owner, handle, payload, &name).await?
                }
                Relation::MorphMany(handle) => {
                    self.fill_morph_many(owner, handle, payload, &name).await?
                }
                Relation::ReadOnly(kind) => {
                    return Err(FillError::UnsupportedRelationKind {
                        relation: name,
                        kind,
                    })
                }
            }
        }

        Ok(())
    }

    /// Save `owner` if `kind` keys its related records by the parent and the
    /// owner has never been persisted, then resolve the relation again, since
    /// `handle` captured the parent key before it existed
    pub(crate) async fn prepare_parent<M, H>(
        &self,
        owner: &mut M,
        name: &str,
        kind: RelationshipType,
        handle: H,
        reacquire: fn(Relation) -> Option<H>,
    ) -> FillResult<H>
    where
        M: FillableModel,
        H: Send,
    {
        if owner.exists() || !kind.requires_persisted_parent() {
            return Ok(handle);
        }

        debug!("Saving new parent before filling relation '{}'", name);
        owner.save().await.map_err(FillError::relation(name))?;
        drop(handle);

        let relation = M::relations()
            .resolve(owner, name)
            .ok_or_else(|| FillError::MissingAccessor {
                relation: name.to_string(),
            })?;
        let resolved = relation.kind();

        reacquire(relation).ok_or_else(|| FillError::UnsupportedRelationKind {
            relation: name.to_string(),
            kind: resolved,
        })
    }

    /// Look up the related record a keyed payload refers to.
    ///
    /// `Ok(None)` means the record is missing and should be created
    /// instead, which only happens under `MissingRelatedPolicy::Create`.
    pub(crate) async fn find_keyed<Q>(
        &self,
        query: &Q,
        key: &Value,
        name: &str,
    ) -> FillResult<Option<Box<dyn FillRecord>>>
    where
        Q: RelatedQuery + ?Sized,
    {
        if let Some(record) = query.find(key).await.map_err(FillError::relation(name))? {
            return Ok(Some(record));
        }

        let criteria = format!("{} = {}", query.related_key_name(), key_to_string(key));
        match self.config.missing_related {
            MissingRelatedPolicy::Fail => Err(FillError::RelatedRecordNotFound {
                relation: name.to_string(),
                criteria,
            }),
            MissingRelatedPolicy::Create => {
                warn!(
                    "No related record for relation '{}' matches {}, creating a new one",
                    name, criteria
                );
                Ok(None)
            }
        }
    }
}
