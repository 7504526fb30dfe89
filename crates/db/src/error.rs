use rulekeeper_core::error::CoreError;

/// Error returned by repository operations that can refuse on domain grounds.
///
/// Plain CRUD methods return `sqlx::Error` directly. Transactional operations
/// that check domain rules mid-transaction return `DbError`, so a refusal
/// drops (and rolls back) the open transaction.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;
