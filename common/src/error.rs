//! Error handling for the ytspark-common crate.

use thiserror::Error;

/// Common error type that abstracts over the storage backends.
///
/// Every variant carries a human readable message and an optional source
/// error, so callers can chain the underlying `object_store` failure.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Storage operation failed: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Path not found: {message}")]
    NotFoundError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Path already exists: {message}")]
    AlreadyExistsError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Permission denied: {message}")]
    PermissionError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Invalid path: {message}")]
    InvalidPathError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

impl CommonError {
    /// Create a storage error with a custom message.
    pub fn storage_error<S: Into<String>>(message: S) -> Self {
        Self::StorageError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with a custom message and source error.
    pub fn storage_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::StorageError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a not found error with a custom message.
    pub fn not_found_error<S: Into<String>>(message: S) -> Self {
        Self::NotFoundError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a not found error with a custom message and source error.
    pub fn not_found_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::NotFoundError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn already_exists_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::AlreadyExistsError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn permission_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::PermissionError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an invalid path error with a custom message.
    pub fn invalid_path_error<S: Into<String>>(message: S) -> Self {
        Self::InvalidPathError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with a custom message and source error.
    pub fn configuration_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether the error means the addressed path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFoundError { .. })
    }
}

impl From<object_store::Error> for CommonError {
    fn from(error: object_store::Error) -> Self {
        use object_store::Error as StoreError;

        let message = error.to_string();
        if matches!(error, StoreError::NotFound { .. }) {
            Self::not_found_error_with_source(message, error)
        } else if matches!(error, StoreError::AlreadyExists { .. }) {
            Self::already_exists_error_with_source(message, error)
        } else if matches!(
            error,
            StoreError::PermissionDenied { .. } | StoreError::Unauthenticated { .. }
        ) {
            Self::permission_error_with_source(message, error)
        } else if matches!(error, StoreError::InvalidPath { .. }) {
            Self::InvalidPathError {
                message,
                source: Some(error.into()),
            }
        } else {
            Self::storage_error_with_source(message, error)
        }
    }
}
