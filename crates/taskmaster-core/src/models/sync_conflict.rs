//! Sync conflict model

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{Entity, Task};
use crate::error::{Error, Result};
use crate::util::now_millis;

/// Divergent local and remote versions of the same entity.
///
/// Exists only until a [`ConflictResolution`] is applied; resolving consumes
/// the conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConflict<T: Entity> {
    local: T,
    remote: T,
    detected_at: DateTime<Utc>,
}

/// Conflict between two versions of a task
pub type TaskConflict = SyncConflict<Task>;

/// How a conflict is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictResolution {
    /// Push the local version to the remote store
    KeepLocal,
    /// Accept the remote version and cache it over the local one
    KeepRemote,
}

impl<T: Entity> SyncConflict<T> {
    /// Pair two versions of one entity, stamped with the current time.
    pub fn new(local: T, remote: T) -> Result<Self> {
        Self::with_detection_time(local, remote, now_millis())
    }

    /// Pair two versions of one entity with an explicit detection time.
    pub fn with_detection_time(local: T, remote: T, detected_at: DateTime<Utc>) -> Result<Self> {
        if local.id() != remote.id() {
            return Err(Error::InvalidData(format!(
                "conflicting versions must share an id ({} != {})",
                local.id(),
                remote.id()
            )));
        }
        Ok(Self {
            local,
            remote,
            detected_at,
        })
    }

    pub fn id(&self) -> T::Id {
        self.local.id()
    }

    pub const fn local(&self) -> &T {
        &self.local
    }

    pub const fn remote(&self) -> &T {
        &self.remote
    }

    pub const fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    /// Split into `(local, remote)`.
    pub fn into_versions(self) -> (T, T) {
        (self.local, self.remote)
    }
}

/// Find cached tasks that an incoming remote snapshot would silently overwrite.
///
/// A conflict is reported for every id present in both sequences whose cached
/// `updated_at` is strictly newer than the remote one. Tasks missing from
/// either side are not conflicts.
pub fn detect_task_conflicts(
    cached: &[Task],
    incoming: &[Task],
    detected_at: DateTime<Utc>,
) -> Vec<TaskConflict> {
    let cached_by_id: HashMap<_, _> = cached.iter().map(|task| (task.id, task)).collect();

    incoming
        .iter()
        .filter_map(|remote| {
            let local = cached_by_id.get(&remote.id)?;
            (local.updated_at > remote.updated_at && *local != remote).then(|| SyncConflict {
                local: (*local).clone(),
                remote: remote.clone(),
                detected_at,
            })
        })
        .collect()
}
