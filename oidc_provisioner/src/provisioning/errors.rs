use thiserror::Error;

use crate::storage::StorageError;

#[derive(Clone, Error, Debug)]
pub enum ProvisioningError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for ProvisioningError {
    fn from(err: sqlx::Error) -> Self {
        ProvisioningError::Storage(err.to_string())
    }
}

impl From<StorageError> for ProvisioningError {
    fn from(err: StorageError) -> Self {
        ProvisioningError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sqlx_error() {
        let err = ProvisioningError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ProvisioningError::Storage(msg) if msg.contains("no rows")));
    }

    #[test]
    fn test_display() {
        let err = ProvisioningError::NotFound("team abc".to_string());
        assert_eq!(err.to_string(), "Not found: team abc");
    }
}
