//! BelongsToMany Fill - Replaces the parent's pivot links

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{FillError, FillResult};
use crate::model::{Attributes, FillRecord, FillableModel};
use crate::relationships::{BelongsToManyRelation, Relation, RelationshipType};

use super::engine::RelationFiller;
use super::payload::{FillValue, RelatedInput};

impl RelationFiller {
    /// Detach every current link, then attach each element.
    ///
    /// Elements are records or filter maps matched exactly against the
    /// related table; a nested pivot map supplies extra join table columns.
    pub async fn fill_belongs_to_many<M: FillableModel>(
        &self,
        owner: &mut M,
        relation: Box<dyn BelongsToManyRelation>,
        payload: FillValue,
        name: &str,
    ) -> FillResult<()> {
        let mut elements = Vec::new();
        for item in payload.into_items(name)? {
            let element = match item.into_related(name)? {
                RelatedInput::Record(record) => Element::Record(record),
                RelatedInput::Attributes(mut filter) => {
                    let pivot = self.take_pivot(&mut filter, name)?;
                    if filter.is_empty() {
                        return Err(FillError::invalid_payload(
                            name,
                            "element has no columns to identify a related record",
                        ));
                    }
                    Element::Filter { filter, pivot }
                }
            };
            elements.push(element);
        }

        let relation = self
            .prepare_parent(owner, name, RelationshipType::ManyToMany, relation, |relation| {
                match relation {
                    Relation::BelongsToMany(handle) => Some(handle),
                    _ => None,
                }
            })
            .await?;

        let detached = relation.detach_all().await.map_err(FillError::relation(name))?;
        debug!(
            "Relation '{}': detached {} link(s), attaching {}",
            name,
            detached,
            elements.len()
        );

        for element in elements {
            match element {
                Element::Record(record) => {
                    relation
                        .attach(record.as_ref(), Attributes::new())
                        .await
                        .map_err(FillError::relation(name))?;
                }
                Element::Filter { filter, pivot } => {
                    let related = relation
                        .first_where(&filter)
                        .await
                        .map_err(FillError::relation(name))?
                        .ok_or_else(|| FillError::RelatedRecordNotFound {
                            relation: name.to_string(),
                            criteria: describe_filter(&filter),
                        })?;

                    trace!("Attaching related record to '{}'", name);
                    relation
                        .attach(related.as_ref(), pivot)
                        .await
                        .map_err(FillError::relation(name))?;
                }
            }
        }

        Ok(())
    }

    fn take_pivot(&self, element: &mut Attributes, name: &str) -> FillResult<Attributes> {
        match element.remove(&self.config().pivot_key) {
            None | Some(Value::Null) => Ok(Attributes::new()),
            Some(Value::Object(columns)) => Ok(columns.into_iter().collect()),
            Some(_) => Err(FillError::invalid_payload(
                name,
                format!("'{}' must be a map of pivot columns", self.config().pivot_key),
            )),
        }
    }
}

/// A validated element, ready to attach once current links are detached
enum Element {
    Record(Box<dyn FillRecord>),
    Filter { filter: Attributes, pivot: Attributes },
}

/// Render filter criteria deterministically for error messages
fn describe_filter(filter: &Attributes) -> String {
    let mut columns: Vec<_> = filter.iter().collect();
    columns.sort_by(|a, b| a.0.cmp(b.0));
    columns
        .into_iter()
        .map(|(column, value)| format!("{} = {}", column, value))
        .collect::<Vec<_>>()
        .join(", ")
}
