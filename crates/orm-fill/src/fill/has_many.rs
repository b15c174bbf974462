//! HasMany / MorphMany Fill - The parent owns a collection of related records
//!
//! The whole incoming list decides the mode once: if no element map carries
//! the related key the current collection is replaced, otherwise keyed
//! elements update their records and untouched records are left alone.

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{FillError, FillResult, ModelError};
use crate::model::FillableModel;
use crate::relationships::{
    HasManyRelation, MorphManyRelation, RelatedQuery, Relation, RelationshipType,
};

use super::engine::RelationFiller;
use super::payload::{FillValue, RelatedInput};

/// Elements of a to-many payload whose shapes have all been checked
struct ManyInputs {
    selective: bool,
    items: Vec<RelatedInput>,
}

impl ManyInputs {
    fn parse<Q>(relation: &Q, payload: FillValue, name: &str) -> FillResult<Self>
    where
        Q: RelatedQuery + ?Sized,
    {
        let key_name = relation.related_key_name();
        let items = payload.into_items(name)?;
        let selective = items.iter().any(|item| item.has_field(&key_name));

        let items = items
            .into_iter()
            .map(|item| item.into_related(name))
            .collect::<FillResult<Vec<_>>>()?;

        Ok(Self { selective, items })
    }
}

impl RelationFiller {
    pub async fn fill_has_many<M: FillableModel>(
        &self,
        owner: &mut M,
        relation: Box<dyn HasManyRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let inputs = ManyInputs::parse(&*relation, payload, name)?;
        let relation = self
            .prepare_parent(owner, name, RelationshipType::HasMany, relation, |relation| {
                match relation {
                    Relation::HasMany(handle) => Some(handle),
                    _ => None,
                }
            })
            .await?;

        self.fill_many_dependent(&*relation, Vec::new(), inputs, name).await
    }

    /// Same as `fill_has_many`; newly built records also get the parent's
    /// morph class in their morph type column
    pub async fn fill_morph_many<M: FillableModel>(
        &self,
        owner: &mut M,
        relation: Box<dyn MorphManyRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let inputs = ManyInputs::parse(&*relation, payload, name)?;
        let relation = self
            .prepare_parent(owner, name, RelationshipType::MorphMany, relation, |relation| {
                match relation {
                    Relation::MorphMany(handle) => Some(handle),
                    _ => None,
                }
            })
            .await?;

        let morph = vec![(relation.morph_type(), Value::String(relation.morph_class()))];
        self.fill_many_dependent(&*relation, morph, inputs, name).await
    }

    async fn fill_many_dependent<R>(
        &self,
        relation: &R,
        morph: Vec<(String, Value)>,
        inputs: ManyInputs,
        name: &str,
    ) -> FillResult<()>
    where
        R: HasManyRelation + ?Sized,
    {
        let parent_key = relation
            .parent_key()
            .ok_or_else(|| FillError::relation(name)(ModelError::MissingPrimaryKey))?;
        let foreign_key = relation.foreign_key_name();
        let key_name = relation.related_key_name();

        if inputs.selective {
            debug!(
                "Selectively updating relation '{}' ({} item(s))",
                name,
                inputs.items.len()
            );
        } else {
            let deleted = relation.delete_all().await.map_err(FillError::relation(name))?;
            debug!(
                "Replacing relation '{}': deleted {} record(s), creating {}",
                name,
                deleted,
                inputs.items.len()
            );
        }

        for input in inputs.items {
            let mut record = match input {
                RelatedInput::Record(record) => record,
                RelatedInput::Attributes(mut attributes) => {
                    attributes.insert(foreign_key.clone(), parent_key.clone());

                    let key = attributes.get(&key_name).filter(|key| !key.is_null()).cloned();
                    let existing = match key {
                        Some(ref key) => self.find_keyed(relation, key, name).await?,
                        None => None,
                    };

                    match existing {
                        Some(mut record) => {
                            trace!("Updating related record for '{}'", name);
                            record.fill(attributes).map_err(FillError::relation(name))?;
                            record
                        }
                        None => {
                            trace!("Creating related record for '{}'", name);
                            attributes.extend(morph.iter().cloned());
                            relation
                                .new_related(attributes)
                                .map_err(FillError::relation(name))?
                        }
                    }
                }
            };

            relation
                .save(record.as_mut())
                .await
                .map_err(FillError::relation(name))?;
        }

        Ok(())
    }
}
