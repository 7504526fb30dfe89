//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers validate input, delegate to the corresponding repository in
//! `rulekeeper_db` and map errors via [`AppError`](crate::error::AppError).

pub mod categories;
pub mod presets;
pub mod rules;
pub mod snapshots;
pub mod stats;
pub mod templates;
