/// Errors from block store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected the operation or could not be reached
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored key does not map to a valid height
    #[error("invalid key in store: {0}")]
    InvalidKey(i64),

    /// Key is too large for the backend's integer type
    #[error("key out of range for store: {0}")]
    KeyOutOfRange(u64),
}

pub type StoreResult<T> = Result<T, StoreError>;
