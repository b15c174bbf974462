//! In-Memory Backend - Record and relation collaborators without a database
//!
//! Implements every trait the fill engine consumes on top of shared
//! in-process tables. Useful for tests and for prototyping models before a
//! real backend exists. Every write lands in a journal so side effects can be
//! asserted on.

pub mod database;
pub mod record;
pub mod relation;

pub use database::{KeyStrategy, MemoryDatabase, Operation, TableSchema};
pub use record::{MemoryModel, MemoryRecord};
pub use relation::MemoryRelation;
