//! Error types for taskmaster-core

use thiserror::Error;

/// Result type alias using taskmaster-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in taskmaster-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A write was attempted without a signed-in principal
    #[error("Not authenticated: please sign in to manage tasks")]
    NotAuthenticated,

    /// Entity absent from the remote store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure talking to the remote store
    #[error("Network error: {0}")]
    Network(String),

    /// Remote store refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed entity or remote payload
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQLite error from the durable local store
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error means the remote store could not be reached or used,
    /// as opposed to the request itself being wrong.
    pub const fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::PermissionDenied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_unavailable_covers_transport_and_permission() {
        assert!(Error::Network("timeout".into()).is_remote_unavailable());
        assert!(Error::PermissionDenied("rules".into()).is_remote_unavailable());
        assert!(!Error::NotAuthenticated.is_remote_unavailable());
        assert!(!Error::NotFound("task".into()).is_remote_unavailable());
    }

    #[test]
    fn messages_are_user_readable() {
        assert_eq!(
            Error::NotFound("task 42".into()).to_string(),
            "Not found: task 42"
        );
        assert!(Error::NotAuthenticated.to_string().contains("sign in"));
    }
}
