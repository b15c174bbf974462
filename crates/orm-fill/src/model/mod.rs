//! Model System - Record and fillable model traits
//!
//! - `record`: dynamic record trait shared by owners and related records
//! - `fillable`: models declaring fillable relations and their accessors

pub mod fillable;
pub mod record;

pub use fillable::{FillableModel, FillsRelations};
pub use record::{keys_match, Attributes, FillRecord};
