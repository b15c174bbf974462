//! # elif-orm-fill: Nested relation mass assignment for elif.rs
//!
//! Extends mass assignment so a single attribute map can carry nested
//! payloads for a model's relations. Scalars are filled through the model's
//! own mass assignment; relation payloads are routed by relation kind to a
//! fill strategy that creates, updates, associates, attaches or detaches the
//! related records.
//!
//! Models opt in by implementing `FillableModel`: they declare which
//! relations may be filled and register an accessor for each one. Record
//! and relation persistence stays with the host ORM, reached through the
//! traits in `model` and `relationships`; the `memory` module provides an
//! in-process implementation of all of them.

pub mod config;
pub mod error;
pub mod fill;
pub mod memory;
pub mod model;
pub mod relationships;

// Re-export core traits and types
pub use config::*;
pub use error::*;
pub use fill::*;
pub use model::*;
pub use relationships::*;
