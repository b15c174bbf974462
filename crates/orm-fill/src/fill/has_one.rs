//! HasOne / MorphOne Fill - The parent owns at most one related record

use serde_json::Value;
use tracing::trace;

use crate::error::{FillError, FillResult, ModelError};
use crate::model::FillableModel;
use crate::relationships::{HasOneRelation, MorphOneRelation, Relation, RelationshipType};

use super::engine::RelationFiller;
use super::payload::{FillValue, RelatedInput};

impl RelationFiller {
    /// Update the related record if the parent already has one, otherwise
    /// create it carrying the parent's key
    pub async fn fill_has_one<M: FillableModel>(
        &self,
        owner: &mut M,
        relation: Box<dyn HasOneRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let input = payload.into_related(name)?;
        let relation = self
            .prepare_parent(owner, name, RelationshipType::HasOne, relation, |relation| {
                match relation {
                    Relation::HasOne(handle) => Some(handle),
                    _ => None,
                }
            })
            .await?;

        self.fill_one_dependent(&*relation, Vec::new(), input, name).await
    }

    /// Same as `fill_has_one`, additionally stamping the parent's morph class
    /// into the related record's morph type column
    pub async fn fill_morph_one<M: FillableModel>(
        &self,
        owner: &mut M,
        relation: Box<dyn MorphOneRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let input = payload.into_related(name)?;
        let relation = self
            .prepare_parent(owner, name, RelationshipType::MorphOne, relation, |relation| {
                match relation {
                    Relation::MorphOne(handle) => Some(handle),
                    _ => None,
                }
            })
            .await?;

        let morph = vec![(relation.morph_type(), Value::String(relation.morph_class()))];
        self.fill_one_dependent(&*relation, morph, input, name).await
    }

    async fn fill_one_dependent<R>(
        &self,
        relation: &R,
        extra: Vec<(String, Value)>,
        input: RelatedInput,
        name: &str,
    ) -> FillResult<()>
    where
        R: HasOneRelation + ?Sized,
    {
        let parent_key = relation
            .parent_key()
            .ok_or_else(|| FillError::relation(name)(ModelError::MissingPrimaryKey))?;

        let mut columns = extra;
        columns.push((relation.foreign_key_name(), parent_key));

        match input {
            RelatedInput::Record(mut record) => {
                for (column, value) in columns {
                    record.set_attribute(&column, value);
                }
                record.save().await.map_err(FillError::relation(name))?;
            }
            RelatedInput::Attributes(mut attributes) => {
                attributes.extend(columns);

                match relation.get_results().await.map_err(FillError::relation(name))? {
                    Some(mut existing) => {
                        trace!("Updating existing related record for '{}'", name);
                        existing.update(attributes).await.map_err(FillError::relation(name))?;
                    }
                    None => {
                        trace!("Creating related record for '{}'", name);
                        let mut record = relation
                            .new_related(attributes)
                            .map_err(FillError::relation(name))?;
                        record.save().await.map_err(FillError::relation(name))?;
                    }
                }
            }
        }

        Ok(())
    }
}
