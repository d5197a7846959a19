use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] taskmaster_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("ID cannot be empty")]
    EmptyId,
    #[error("Task not found for id/prefix: {0}")]
    TaskNotFound(String),
    #[error("Category not found for id/prefix: {0}")]
    CategoryNotFound(String),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Invalid due date '{0}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidDueDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Sync failed: {0}")]
    Sync(String),
    #[error(
        "Remote store is not configured. Set remote.base_url in the config file or TASKMASTER_API_URL, or pass --offline."
    )]
    RemoteNotConfigured,
}
