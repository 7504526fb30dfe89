//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` + `Validate` DTOs for inserts and patches
//! - Enriched read models assembled from several queries

pub mod category;
pub mod preset;
pub mod rule;
pub mod snapshot;
pub mod stats;
pub mod template;
