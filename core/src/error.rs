//! Error types for Canopy

use thiserror::Error;

use crate::types::Version;

/// Main error type for Canopy
#[derive(Error, Debug)]
pub enum StoreError {
    // ============ Configuration Errors ============
    #[error("Store key already mounted: {0}")]
    DuplicateMount(String),

    #[error("Store name already mounted by another key: {0}")]
    DuplicateName(String),

    #[error("Cannot mount store {0}: multistore already loaded")]
    MountAfterLoad(String),

    #[error("Multistore already loaded")]
    AlreadyLoaded,

    #[error("Multistore not loaded")]
    NotLoaded,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============ Version Errors ============
    #[error("Version {version} not found in store {store}")]
    VersionNotFound { store: String, version: Version },

    #[error("Invalid version: {0}")]
    InvalidVersion(Version),

    // ============ Consistency Errors ============
    #[error("Version mismatch in store {store}: expected {expected}, got {got}")]
    VersionMismatch {
        store: String,
        expected: Version,
        got: Version,
    },

    #[error("State corruption detected: {0}")]
    StateCorruption(String),

    #[error("Multistore unusable after failed commit: {0}")]
    CommitFailed(String),

    // ============ Storage Errors ============
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ============ Query Errors ============
    #[error("Malformed path: {0}")]
    MalformedPath(String),

    // ============ Serialization Errors ============
    #[error("Serialization failed: {0}")]
    Serialization(String),

    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Errors the caller must treat as unrecoverable.
    ///
    /// Configuration and consistency violations signal programmer mistakes or
    /// a broken substore; storage failures leave substores in an unknown state.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StoreError::VersionNotFound { .. }
                | StoreError::InvalidVersion(_)
                | StoreError::MalformedPath(_)
                | StoreError::InvalidKey(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::VersionNotFound { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(StoreError::DuplicateName("store1".into()).is_fatal());
        assert!(StoreError::MountAfterLoad("store1".into()).is_fatal());
        assert!(StoreError::VersionMismatch {
            store: "store1".into(),
            expected: 2,
            got: 3,
        }
        .is_fatal());

        let not_found = StoreError::VersionNotFound {
            store: "store1".into(),
            version: 9,
        };
        assert!(!not_found.is_fatal());
        assert!(not_found.is_not_found());
        assert!(!StoreError::MalformedPath("foo".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::VersionNotFound {
            store: "store2".into(),
            version: 7,
        };
        assert_eq!(err.to_string(), "Version 7 not found in store store2");
    }
}
