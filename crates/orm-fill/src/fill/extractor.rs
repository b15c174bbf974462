//! Extractor - Splits raw input into relation payloads and scalar attributes

use super::payload::{FillAttributes, FillValue};

/// Relation payloads in the order they will be filled
pub type RelationPayloads = Vec<(String, FillValue)>;

/// Remove every fillable relation key from `attributes`.
///
/// Names are visited in declared order. A present key is always removed;
/// its value becomes a relation payload unless it is null. Whatever remains
/// is the scalar portion.
pub fn extract_fillable(
    mut attributes: FillAttributes,
    fillable: &[&str],
) -> (RelationPayloads, FillAttributes) {
    let mut relations = RelationPayloads::new();

    for name in fillable {
        if let Some(value) = attributes.remove(name) {
            if !value.is_null() {
                relations.push((name.to_string(), value));
            }
        }
    }

    (relations, attributes)
}
