use crate::store::StoreError;

/// Errors produced by chain operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("block not found at height {height}")]
    NotFound { height: u64 },

    #[error("block has not been found by hash: {0}")]
    HashNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt block at height {height}: {reason}")]
    Corrupt { height: u64, reason: String },
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::HashNotFound(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
