//! Bulk reconciliation of the local caches from the remote store
//!
//! [`SyncEngine`] pulls the full remote task and category collections and
//! replaces the cached copies, tracking the outcome as a [`SyncStatus`].
//! At most one reconciliation runs at a time.

mod auto;
mod engine;

pub use auto::AutoSyncHandle;
pub use engine::SyncEngine;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::models::SyncStatus;

/// Observable engine state, published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Message of the error retained by the last failed run
    pub last_error: Option<String>,
    pub conflict_count: usize,
}

/// Summary of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub tasks: usize,
    pub categories: usize,
    pub conflicts: usize,
    pub completed_at: DateTime<Utc>,
}

/// Result of a `sync` call
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Synced(SyncReport),
    Failed(Arc<Error>),
    /// Another reconciliation was in flight; nothing was done
    AlreadyRunning,
}

impl SyncOutcome {
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced(_))
    }

    /// Convert to a `Result`, treating an in-flight run as `Ok(None)`.
    pub fn into_result(self) -> Result<Option<SyncReport>, Arc<Error>> {
        match self {
            Self::Synced(report) => Ok(Some(report)),
            Self::Failed(error) => Err(error),
            Self::AlreadyRunning => Ok(None),
        }
    }
}
