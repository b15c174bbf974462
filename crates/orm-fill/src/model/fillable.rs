//! Fillable Models - Models that accept nested relation attributes

use async_trait::async_trait;

use crate::error::FillResult;
use crate::fill::{FillAttributes, RelationFiller};
use crate::relationships::RelationRegistry;

use super::record::FillRecord;

/// A model whose relations can be filled from nested attributes
pub trait FillableModel: FillRecord + Sized + 'static {
    /// Relation names accepted as nested attributes, in fill order
    fn fillable_relations() -> &'static [&'static str] {
        &[]
    }

    /// Accessors for this model's relations
    fn relations() -> &'static RelationRegistry<Self>;

    /// A fresh, unsaved instance of the same model
    fn new_instance(&self) -> Self;
}

/// Nested fill entry points for every fillable model, using the default
/// engine configuration
#[async_trait]
pub trait FillsRelations: FillableModel {
    /// Fill scalars and relations; the model itself is not saved
    async fn fill_with_relations(&mut self, attributes: FillAttributes) -> FillResult<()> {
        RelationFiller::default().fill(self, attributes).await
    }

    /// Build, fill and save a new instance
    async fn create_with_relations(&self, attributes: FillAttributes) -> FillResult<Self> {
        RelationFiller::default().create(self, attributes).await
    }
}

impl<T: FillableModel> FillsRelations for T {}
