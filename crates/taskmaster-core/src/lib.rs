//! taskmaster-core - Core library for TaskMaster
//!
//! This crate contains the offline-first data layer shared by all TaskMaster
//! front ends: the domain models, the local cache stores, the remote document
//! store clients, the read-through/write-through repositories, the sync engine
//! and the conflict model.

pub mod auth;
pub mod config;
pub mod container;
pub mod error;
pub mod models;
pub mod remote;
pub mod repository;
pub mod store;
pub mod sync;
pub mod use_cases;
pub mod util;

pub use auth::{AuthSession, AuthState};
pub use container::AppContainer;
pub use error::{Error, Result};
pub use models::{
    Category, CategoryId, ConflictResolution, Priority, SyncConflict, SyncStatus, Task,
    TaskConflict, TaskId,
};
pub use repository::{CategoryRepository, Repository, TaskRepository};
pub use sync::{AutoSyncHandle, SyncEngine, SyncOutcome};
