//! Relationships Module - Relation metadata, handles and accessor registry

pub mod metadata;
pub mod registry;
pub mod traits;

// Re-export main types
pub use metadata::*;
pub use registry::*;
pub use traits::*;
