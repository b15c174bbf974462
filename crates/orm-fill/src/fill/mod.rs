//! Relation Fill - Nested mass assignment for model relations
//!
//! - `payload`: raw input values and their per-relation shapes
//! - `extractor`: splits relation payloads from scalar attributes
//! - `engine`: entry points and per-relation dispatch
//! - one module per relation kind family with its fill strategy

pub mod engine;
pub mod extractor;
pub mod payload;

mod belongs_to;
mod belongs_to_many;
mod has_many;
mod has_one;
mod morph_to;

pub use engine::RelationFiller;
pub use extractor::{extract_fillable, RelationPayloads};
pub use payload::{FillAttributes, FillValue};
