use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::{SyncOutcome, SyncReport, SyncSnapshot};
use crate::auth::AuthSession;
use crate::error::{Error, Result};
use crate::models::{detect_task_conflicts, Category, SyncStatus, Task, TaskConflict};
use crate::remote::RemoteStore;
use crate::repository::{CategoryRepository, TaskRepository};
use crate::store::LocalStore;
use crate::util::now_millis;

#[derive(Default)]
struct EngineState {
    last_sync_at: Option<DateTime<Utc>>,
    last_error: Option<Arc<Error>>,
    conflicts: Vec<TaskConflict>,
}

/// Coordinates full pulls of tasks and categories into the local caches.
pub struct SyncEngine {
    task_local: Arc<dyn LocalStore<Task>>,
    task_remote: Arc<dyn RemoteStore<Task>>,
    category_local: Arc<dyn LocalStore<Category>>,
    category_remote: Arc<dyn RemoteStore<Category>>,
    detect_conflicts: bool,
    status: AtomicU8,
    state: Mutex<EngineState>,
    events: watch::Sender<SyncSnapshot>,
}

/// Restores the previous status if a run is abandoned mid-flight.
struct PendingGuard<'a> {
    engine: &'a SyncEngine,
    previous: SyncStatus,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Sync abandoned before completion");
            self.engine
                .status
                .store(self.previous.to_u8(), Ordering::Release);
            self.engine.publish();
        }
    }
}

impl SyncEngine {
    /// Build an engine over the stores behind the given repositories.
    pub fn new(tasks: &TaskRepository, categories: &CategoryRepository) -> Self {
        let (events, _) = watch::channel(SyncSnapshot::default());
        Self {
            task_local: Arc::clone(tasks.local()),
            task_remote: Arc::clone(tasks.remote()),
            category_local: Arc::clone(categories.local()),
            category_remote: Arc::clone(categories.remote()),
            detect_conflicts: true,
            status: AtomicU8::new(SyncStatus::None.to_u8()),
            state: Mutex::new(EngineState::default()),
            events,
        }
    }

    /// Enable or disable capturing conflicts during pulls.
    #[must_use]
    pub const fn with_conflict_detection(mut self, enabled: bool) -> Self {
        self.detect_conflicts = enabled;
        self
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.lock().last_sync_at
    }

    /// Error retained by the most recent failed run
    pub fn last_error(&self) -> Option<Arc<Error>> {
        self.lock().last_error.clone()
    }

    /// Conflicts captured by the most recent successful pull
    pub fn conflicts(&self) -> Vec<TaskConflict> {
        self.lock().conflicts.clone()
    }

    /// Remove and return the pending conflicts.
    pub fn take_conflicts(&self) -> Vec<TaskConflict> {
        let conflicts = std::mem::take(&mut self.lock().conflicts);
        self.publish();
        conflicts
    }

    /// Current engine state.
    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.lock();
        SyncSnapshot {
            status: self.status(),
            last_sync_at: state.last_sync_at,
            last_error: state.last_error.as_ref().map(ToString::to_string),
            conflict_count: state.conflicts.len(),
        }
    }

    /// Receive a [`SyncSnapshot`] after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.events.subscribe()
    }

    fn publish(&self) {
        self.events.send_replace(self.snapshot());
    }

    /// Run one reconciliation unless another one is in flight.
    ///
    /// Without a session the run fails with `NotAuthenticated`, leaving the
    /// caches untouched.
    pub async fn sync(&self, session: Option<&AuthSession>) -> SyncOutcome {
        let pending = SyncStatus::Pending.to_u8();
        let claimed = self
            .status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != pending).then_some(pending)
            });
        let Ok(previous) = claimed else {
            tracing::debug!("Sync already in progress, skipping");
            return SyncOutcome::AlreadyRunning;
        };

        let mut guard = PendingGuard {
            engine: self,
            previous: SyncStatus::from_u8(previous),
            armed: true,
        };
        self.publish();

        let result = self.reconcile(session).await;
        guard.armed = false;

        match result {
            Ok((report, conflicts)) => {
                {
                    let mut state = self.lock();
                    state.last_sync_at = Some(report.completed_at);
                    state.last_error = None;
                    state.conflicts = conflicts;
                }
                self.status
                    .store(SyncStatus::Synced.to_u8(), Ordering::Release);
                self.publish();
                tracing::info!(
                    "Synced {} tasks and {} categories ({} conflicts)",
                    report.tasks,
                    report.categories,
                    report.conflicts
                );
                SyncOutcome::Synced(report)
            }
            Err(error) => {
                tracing::warn!("Sync failed: {}", error);
                let error = Arc::new(error);
                self.lock().last_error = Some(Arc::clone(&error));
                self.status
                    .store(SyncStatus::Failed.to_u8(), Ordering::Release);
                self.publish();
                SyncOutcome::Failed(error)
            }
        }
    }

    async fn reconcile(
        &self,
        session: Option<&AuthSession>,
    ) -> Result<(SyncReport, Vec<TaskConflict>)> {
        let session = session.ok_or(Error::NotAuthenticated)?;

        let tasks = self.task_remote.list(Some(session)).await?;
        let categories = self.category_remote.list(Some(session)).await?;
        let completed_at = now_millis();

        let conflicts = if self.detect_conflicts {
            detect_task_conflicts(&self.task_local.list(), &tasks, completed_at)
        } else {
            Vec::new()
        };
        for conflict in &conflicts {
            tracing::warn!(
                "Task {} was modified locally after the remote copy",
                conflict.id()
            );
        }

        let report = SyncReport {
            tasks: tasks.len(),
            categories: categories.len(),
            conflicts: conflicts.len(),
            completed_at,
        };
        self.task_local
            .replace_all(keep_local_versions(tasks, &conflicts));
        self.category_local.replace_all(categories);
        Ok((report, conflicts))
    }
}

/// Substitute the cached version for every conflicted task so the divergence
/// outlives this process and is detected again by the next pull.
fn keep_local_versions(mut tasks: Vec<Task>, conflicts: &[TaskConflict]) -> Vec<Task> {
    for task in &mut tasks {
        if let Some(conflict) = conflicts.iter().find(|conflict| conflict.id() == task.id) {
            task.clone_from(conflict.local());
        }
    }
    tasks
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &self.status())
            .field("detect_conflicts", &self.detect_conflicts)
            .finish_non_exhaustive()
    }
}
