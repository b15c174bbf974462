//! MorphTo Fill - The owner points at a record of one of several types

use tracing::trace;

use crate::error::{FillError, FillResult, ModelError};
use crate::model::FillRecord;
use crate::relationships::MorphToRelation;

use super::engine::RelationFiller;
use super::payload::{FillValue, RelatedInput};

impl RelationFiller {
    /// Update the record the owner currently points at, or find / create
    /// one, then associate the owner with it (in memory only)
    pub async fn fill_morph_to(
        &self,
        owner: &mut dyn FillRecord,
        relation: Box<dyn MorphToRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let related = match payload.into_related(name)? {
            RelatedInput::Record(mut record) => {
                if !relation.accepts(record.morph_class()) {
                    return Err(FillError::relation(name)(ModelError::Relationship(format!(
                        "Relationship '{}' does not accept '{}' records",
                        name,
                        record.morph_class()
                    ))));
                }
                record.save().await.map_err(FillError::relation(name))?;
                record
            }
            RelatedInput::Attributes(attributes) => {
                let current = relation.get_results().await.map_err(FillError::relation(name))?;

                let existing = match current {
                    Some(record) => Some(record),
                    None => {
                        let key = attributes
                            .get(&relation.related_key_name())
                            .filter(|key| !key.is_null())
                            .cloned();
                        match key {
                            Some(ref key) => self.find_keyed(&*relation, key, name).await?,
                            None => None,
                        }
                    }
                };

                match existing {
                    Some(mut record) => {
                        trace!("Updating morphed record for '{}'", name);
                        record.update(attributes).await.map_err(FillError::relation(name))?;
                        record
                    }
                    None => {
                        trace!("Creating morphed record for '{}'", name);
                        relation.create(attributes).await.map_err(FillError::relation(name))?
                    }
                }
            }
        };

        relation
            .associate(owner, related.as_ref())
            .map_err(FillError::relation(name))
    }
}
