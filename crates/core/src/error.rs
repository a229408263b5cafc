use crate::validation::Violations;

/// Errors raised by a store adapter (primary or secondary).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx_core::error::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
    #[error("failed to serialise document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid registration: {0}")]
    Validation(Violations),
    #[error("primary store failure: {0}")]
    PrimaryStore(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_to_primary_failure() {
        let err: RegistryError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, RegistryError::PrimaryStore(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
