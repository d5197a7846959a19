//! Application operations consumed by front ends
//!
//! Each use case wraps exactly one repository (or engine) call and reads the
//! current session from [`AuthState`] at execution time.

use std::sync::Arc;

use crate::auth::{AuthSession, AuthState};
use crate::error::Result;
use crate::models::{Category, CategoryId, ConflictResolution, Task, TaskConflict, TaskId};
use crate::repository::{CategoryRepository, TaskRepository};
use crate::store::LocalStore;
use crate::sync::{SyncEngine, SyncOutcome};

macro_rules! use_case {
    ($(#[$meta:meta])* $name:ident, $field:ident: $repo:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            $field: $repo,
            auth: AuthState,
        }

        impl $name {
            pub const fn new($field: $repo, auth: AuthState) -> Self {
                Self { $field, auth }
            }
        }
    };
}

use_case!(
    /// Create a task in the remote store and cache it.
    CreateTask, tasks: TaskRepository
);

impl CreateTask {
    pub async fn execute(&self, task: Task) -> Result<Task> {
        self.tasks.create(self.auth.current().as_ref(), task).await
    }
}

use_case!(
    /// Push an edited task; the result carries the server's `updated_at`.
    UpdateTask, tasks: TaskRepository
);

impl UpdateTask {
    pub async fn execute(&self, task: Task) -> Result<Task> {
        self.tasks.update(self.auth.current().as_ref(), task).await
    }
}

use_case!(DeleteTask, tasks: TaskRepository);

impl DeleteTask {
    pub async fn execute(&self, id: &TaskId) -> Result<()> {
        self.tasks.delete(self.auth.current().as_ref(), id).await
    }
}

use_case!(GetTask, tasks: TaskRepository);

impl GetTask {
    pub async fn execute(&self, id: &TaskId) -> Result<Option<Task>> {
        self.tasks.get(self.auth.current().as_ref(), id).await
    }
}

use_case!(GetTasks, tasks: TaskRepository);

impl GetTasks {
    pub async fn execute(&self) -> Result<Vec<Task>> {
        self.tasks.list(self.auth.current().as_ref()).await
    }
}

use_case!(GetTasksByCategory, tasks: TaskRepository);

impl GetTasksByCategory {
    pub async fn execute(&self, category_id: &CategoryId) -> Result<Vec<Task>> {
        self.tasks
            .list_by_category(self.auth.current().as_ref(), category_id)
            .await
    }
}

use_case!(SearchTasks, tasks: TaskRepository);

impl SearchTasks {
    pub async fn execute(&self, query: &str) -> Result<Vec<Task>> {
        self.tasks.search(self.auth.current().as_ref(), query).await
    }
}

use_case!(
    /// Flip a task's completion flag and push it.
    ToggleTaskCompletion, tasks: TaskRepository
);

impl ToggleTaskCompletion {
    pub async fn execute(&self, mut task: Task) -> Result<Task> {
        task.toggle_completion();
        self.tasks.update(self.auth.current().as_ref(), task).await
    }
}

use_case!(
    /// Settle a conflict between a local and a remote task version.
    ///
    /// `KeepLocal` pushes the local version and returns the server-stamped
    /// result. `KeepRemote` makes no remote call; it caches the remote version
    /// in place of the local one and returns it.
    ResolveConflict, tasks: TaskRepository
);

impl ResolveConflict {
    pub async fn execute(
        &self,
        conflict: TaskConflict,
        resolution: ConflictResolution,
    ) -> Result<Task> {
        let (local, remote) = conflict.into_versions();
        match resolution {
            ConflictResolution::KeepLocal => {
                tracing::debug!("Resolving task {} with the local version", local.id);
                self.tasks.update(self.auth.current().as_ref(), local).await
            }
            ConflictResolution::KeepRemote => {
                tracing::debug!("Resolving task {} with the remote version", remote.id);
                self.tasks.local().put(remote.clone());
                Ok(remote)
            }
        }
    }
}

use_case!(CreateCategory, categories: CategoryRepository);

impl CreateCategory {
    pub async fn execute(&self, category: Category) -> Result<Category> {
        self.categories
            .create(self.auth.current().as_ref(), category)
            .await
    }
}

use_case!(UpdateCategory, categories: CategoryRepository);

impl UpdateCategory {
    pub async fn execute(&self, category: Category) -> Result<Category> {
        self.categories
            .update(self.auth.current().as_ref(), category)
            .await
    }
}

use_case!(
    /// Delete a category. Tasks referencing it keep the dangling id.
    DeleteCategory, categories: CategoryRepository
);

impl DeleteCategory {
    pub async fn execute(&self, id: &CategoryId) -> Result<()> {
        self.categories
            .delete(self.auth.current().as_ref(), id)
            .await
    }
}

use_case!(GetCategories, categories: CategoryRepository);

impl GetCategories {
    pub async fn execute(&self) -> Result<Vec<Category>> {
        self.categories.list(self.auth.current().as_ref()).await
    }
}

use_case!(
    /// Run one full reconciliation with the current session.
    SyncData, engine: Arc<SyncEngine>
);

impl SyncData {
    pub async fn execute(&self) -> SyncOutcome {
        self.engine.sync(self.auth.current().as_ref()).await
    }
}

/// Session access for front ends.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    auth: AuthState,
}

impl CurrentSession {
    pub const fn new(auth: AuthState) -> Self {
        Self { auth }
    }

    pub fn get(&self) -> Option<AuthSession> {
        self.auth.current()
    }

    pub fn sign_in(&self, session: AuthSession) {
        self.auth.sign_in(session);
    }

    pub fn sign_out(&self) {
        self.auth.sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::MemoryRemoteStore;
    use crate::repository::Repository;
    use crate::store::{LocalStore, MemoryStore};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    struct Fixture {
        remote: Arc<MemoryRemoteStore<Task>>,
        local: Arc<MemoryStore<Task>>,
        tasks: TaskRepository,
        auth: AuthState,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        Fixture {
            tasks: Repository::new(local.clone(), remote.clone()),
            remote,
            local,
            auth: AuthState::new(Some(AuthSession::new("user-1", "token"))),
        }
    }

    fn backdated(title: &str) -> Task {
        let mut task = Task::new(title);
        task.created_at -= Duration::hours(1);
        task.updated_at = task.created_at;
        task
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_completion() {
        let f = fixture();
        let create = CreateTask::new(f.tasks.clone(), f.auth.clone());
        let toggle = ToggleTaskCompletion::new(f.tasks.clone(), f.auth.clone());

        let original = create.execute(backdated("Laundry")).await.unwrap();
        let once = toggle.execute(original.clone()).await.unwrap();
        assert!(once.is_completed);
        assert!(once.updated_at > original.updated_at);

        let twice = toggle.execute(once.clone()).await.unwrap();
        assert_eq!(twice.is_completed, original.is_completed);
        assert!(twice.updated_at >= once.updated_at);
    }

    #[tokio::test]
    async fn test_keep_local_pushes_local_version() {
        let f = fixture();
        let remote_version = backdated("Remote title");
        f.remote.seed("user-1", [remote_version.clone()]);
        let mut local_version = remote_version.clone();
        local_version.title = "Local title".to_string();
        local_version.description = Some("edited offline".to_string());

        let conflict = TaskConflict::new(local_version.clone(), remote_version).unwrap();
        let resolve = ResolveConflict::new(f.tasks.clone(), f.auth.clone());
        let resolved = resolve
            .execute(conflict, ConflictResolution::KeepLocal)
            .await
            .unwrap();

        assert_eq!(resolved.title, local_version.title);
        assert_eq!(resolved.description, local_version.description);
        assert_eq!(f.remote.calls().update, 1);
        assert_eq!(f.remote.documents("user-1"), vec![resolved.clone()]);
        assert_eq!(f.local.get(&resolved.id), Some(resolved));
    }

    #[tokio::test]
    async fn test_keep_remote_replaces_cached_local_version() {
        let f = fixture();
        let remote_version = backdated("Remote title");
        let mut local_version = remote_version.clone();
        local_version.title = "Local title".to_string();
        f.local.put(local_version.clone());

        let conflict = TaskConflict::new(local_version, remote_version.clone()).unwrap();
        let resolve = ResolveConflict::new(f.tasks.clone(), f.auth.clone());
        let resolved = resolve
            .execute(conflict, ConflictResolution::KeepRemote)
            .await
            .unwrap();

        assert_eq!(resolved, remote_version);
        assert_eq!(f.remote.calls().update, 0);
        assert_eq!(f.local.get(&remote_version.id), Some(remote_version));
    }

    #[tokio::test]
    async fn test_use_cases_follow_sign_out() {
        let f = fixture();
        let session = CurrentSession::new(f.auth.clone());
        let create = CreateTask::new(f.tasks.clone(), f.auth.clone());
        let list = GetTasks::new(f.tasks.clone(), f.auth.clone());

        create.execute(Task::new("Before")).await.unwrap();
        session.sign_out();
        assert!(session.get().is_none());

        assert!(matches!(
            create.execute(Task::new("After")).await,
            Err(Error::NotAuthenticated)
        ));
        assert!(list.execute().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_use_cases() {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let categories: CategoryRepository = Repository::new(local.clone(), remote.clone());
        let auth = AuthState::new(Some(AuthSession::new("user-1", "token")));

        let create = CreateCategory::new(categories.clone(), auth.clone());
        let update = UpdateCategory::new(categories.clone(), auth.clone());
        let delete = DeleteCategory::new(categories.clone(), auth.clone());
        let list = GetCategories::new(categories, auth);

        let work = create
            .execute(Category::new("Work", "#336699", "briefcase"))
            .await
            .unwrap();
        let mut renamed = work.clone();
        renamed.name = "Office".to_string();
        update.execute(renamed).await.unwrap();
        assert_eq!(list.execute().await.unwrap()[0].name, "Office");

        delete.execute(&work.id).await.unwrap();
        assert!(list.execute().await.unwrap().is_empty());
        assert!(local.list().is_empty());
        assert!(remote.documents("user-1").is_empty());
    }

    #[tokio::test]
    async fn test_search_and_category_filters() {
        let f = fixture();
        let work = CategoryId::new();
        f.remote.seed(
            "user-1",
            [
                Task::new("Quarterly report").with_category(work),
                Task::new("Buy milk"),
            ],
        );

        let search = SearchTasks::new(f.tasks.clone(), f.auth.clone());
        let by_category = GetTasksByCategory::new(f.tasks.clone(), f.auth.clone());
        let get = GetTask::new(f.tasks.clone(), f.auth.clone());
        let delete = DeleteTask::new(f.tasks.clone(), f.auth.clone());

        let found = search.execute("REPORT").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(by_category.execute(&work).await.unwrap(), found);

        delete.execute(&found[0].id).await.unwrap();
        assert_eq!(get.execute(&found[0].id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sync_data_uses_current_session() {
        let tasks: TaskRepository =
            Repository::new(Arc::new(MemoryStore::new()), Arc::new(MemoryRemoteStore::new()));
        let categories: CategoryRepository =
            Repository::new(Arc::new(MemoryStore::new()), Arc::new(MemoryRemoteStore::new()));
        let engine = Arc::new(SyncEngine::new(&tasks, &categories));
        let auth = AuthState::signed_out();
        let sync = SyncData::new(engine, auth.clone());

        assert!(matches!(sync.execute().await, SyncOutcome::Failed(_)));
        auth.sign_in(AuthSession::new("user-1", "token"));
        assert!(sync.execute().await.is_synced());
    }
}
