//! Pure domain logic for the rule library.
//!
//! Nothing in this crate performs I/O. The database crate persists these
//! types and the API crate exposes them over HTTP.

pub mod error;
pub mod markdown;
pub mod naming;
pub mod ordering;
pub mod rule;
pub mod snapshot;
pub mod types;
pub mod validation;
