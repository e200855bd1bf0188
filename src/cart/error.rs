use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by the Cart Engine. Storage errors never cross this boundary as-is.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("cart operation failed: {0}")]
    Internal(String),
}

impl CartError {
    pub fn not_found(message: impl Into<String>) -> Self {
        CartError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CartError::Validation(message.into())
    }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "cart storage failure");
        CartError::Internal(err.to_string())
    }
}

pub type CartResult<T> = Result<T, CartError>;
