use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The membership being added already exists.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An action string outside the accepted set.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A reorder that would move past the first or last position.
    #[error("Boundary: {0}")]
    Boundary(String),

    /// A bulk operation that found nothing to do.
    #[error("Nothing to add: {0}")]
    EmptyResult(String),
}
