//! BelongsTo Fill - The owner points at a single related record

use tracing::trace;

use crate::error::{FillError, FillResult};
use crate::model::FillRecord;
use crate::relationships::BelongsToRelation;

use super::engine::RelationFiller;
use super::payload::{FillValue, RelatedInput};

impl RelationFiller {
    /// Save, update or create the related record, then associate the owner
    /// with it. The owner's foreign key is only set in memory.
    pub async fn fill_belongs_to(
        &self,
        owner: &mut dyn FillRecord,
        relation: Box<dyn BelongsToRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let related = match payload.into_related(name)? {
            RelatedInput::Record(mut record) => {
                record.save().await.map_err(FillError::relation(name))?;
                record
            }
            RelatedInput::Attributes(attributes) => {
                let key = attributes
                    .get(&relation.related_key_name())
                    .filter(|key| !key.is_null())
                    .cloned();

                let existing = match key {
                    Some(ref key) => self.find_keyed(&*relation, key, name).await?,
                    None => None,
                };

                match existing {
                    Some(mut record) => {
                        trace!("Updating related record for '{}'", name);
                        record.update(attributes).await.map_err(FillError::relation(name))?;
                        record
                    }
                    None => {
                        trace!("Creating related record for '{}'", name);
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
