//! Process-wide dependency container.
//!
//! Built once at startup and handed to front ends, which obtain repositories,
//! use cases and the sync engine from it.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::auth::AuthState;
use crate::config::{CoreConfig, LocalBackend};
use crate::error::{Error, Result};
use crate::models::{Category, Task};
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::repository::{CategoryRepository, Repository, TaskRepository};
use crate::store::{LocalDatabase, LocalStore, MemoryStore};
use crate::sync::{AutoSyncHandle, SyncEngine};
use crate::use_cases::{
    CreateCategory, CreateTask, CurrentSession, DeleteCategory, DeleteTask, GetCategories,
    GetTask, GetTasks, GetTasksByCategory, ResolveConflict, SearchTasks, SyncData,
    ToggleTaskCompletion, UpdateCategory, UpdateTask,
};

pub struct AppContainer {
    config: CoreConfig,
    auth: AuthState,
    tasks: TaskRepository,
    categories: CategoryRepository,
    sync_engine: Arc<SyncEngine>,
    auto_sync: Mutex<Option<AutoSyncHandle>>,
}

impl AppContainer {
    /// Wire the HTTP remote store and the configured local backend.
    pub fn from_config(config: CoreConfig, auth: AuthState) -> Result<Self> {
        config.validate()?;
        let base_url = config
            .remote_base_url()
            .ok_or_else(|| Error::Config("remote.base_url is required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.remote_timeout())
            .build()
            .map_err(|error| Error::Config(format!("Failed to construct HTTP client: {error}")))?;
        let task_remote = HttpRemoteStore::<Task>::with_client(base_url.clone(), client.clone())?;
        let category_remote = HttpRemoteStore::<Category>::with_client(base_url, client)?;

        Self::with_remotes(config, auth, Arc::new(task_remote), Arc::new(category_remote))
    }

    /// Wire explicit remote stores with the configured local backend.
    pub fn with_remotes(
        config: CoreConfig,
        auth: AuthState,
        task_remote: Arc<dyn RemoteStore<Task>>,
        category_remote: Arc<dyn RemoteStore<Category>>,
    ) -> Result<Self> {
        config.validate()?;
        let (task_local, category_local): (Arc<dyn LocalStore<Task>>, Arc<dyn LocalStore<Category>>) =
            match config.local.backend {
                LocalBackend::Memory => (
                    Arc::new(MemoryStore::new()),
                    Arc::new(MemoryStore::new()),
                ),
                LocalBackend::Sqlite => {
                    let path = config.local.path.as_ref().ok_or_else(|| {
                        Error::Config("local.path is required for the sqlite backend".to_string())
                    })?;
                    let database = LocalDatabase::open(path)?;
                    (
                        Arc::new(database.store::<Task>()),
                        Arc::new(database.store::<Category>()),
                    )
                }
            };

        Ok(Self::with_stores(
            config,
            auth,
            Repository::new(task_local, task_remote),
            Repository::new(category_local, category_remote),
        ))
    }

    /// Assemble from ready-made repositories.
    pub fn with_stores(
        config: CoreConfig,
        auth: AuthState,
        tasks: TaskRepository,
        categories: CategoryRepository,
    ) -> Self {
        let sync_engine = Arc::new(
            SyncEngine::new(&tasks, &categories)
                .with_conflict_detection(config.sync.detect_conflicts),
        );
        Self {
            config,
            auth,
            tasks,
            categories,
            sync_engine,
            auto_sync: Mutex::new(None),
        }
    }

    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub const fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub const fn tasks(&self) -> &TaskRepository {
        &self.tasks
    }

    pub const fn categories(&self) -> &CategoryRepository {
        &self.categories
    }

    pub const fn sync_engine(&self) -> &Arc<SyncEngine> {
        &self.sync_engine
    }

    /// Start periodic sync at the configured interval, replacing any running loop.
    pub fn start_auto_sync(&self) {
        let handle = self
            .sync_engine
            .start_auto_sync(self.auth.clone(), self.config.auto_sync_interval());
        let previous = self
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Stop periodic sync; returns the handle so callers can await shutdown.
    pub fn stop_auto_sync(&self) -> Option<AutoSyncHandle> {
        let handle = self
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = &handle {
            handle.stop();
        }
        handle
    }

    pub fn session(&self) -> CurrentSession {
        CurrentSession::new(self.auth.clone())
    }

    pub fn create_task(&self) -> CreateTask {
        CreateTask::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn update_task(&self) -> UpdateTask {
        UpdateTask::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn delete_task(&self) -> DeleteTask {
        DeleteTask::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn get_task(&self) -> GetTask {
        GetTask::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn get_tasks(&self) -> GetTasks {
        GetTasks::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn get_tasks_by_category(&self) -> GetTasksByCategory {
        GetTasksByCategory::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn search_tasks(&self) -> SearchTasks {
        SearchTasks::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn toggle_task_completion(&self) -> ToggleTaskCompletion {
        ToggleTaskCompletion::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn resolve_conflict(&self) -> ResolveConflict {
        ResolveConflict::new(self.tasks.clone(), self.auth.clone())
    }

    pub fn create_category(&self) -> CreateCategory {
        CreateCategory::new(self.categories.clone(), self.auth.clone())
    }

    pub fn update_category(&self) -> UpdateCategory {
        UpdateCategory::new(self.categories.clone(), self.auth.clone())
    }

    pub fn delete_category(&self) -> DeleteCategory {
        DeleteCategory::new(self.categories.clone(), self.auth.clone())
    }

    pub fn get_categories(&self) -> GetCategories {
        GetCategories::new(self.categories.clone(), self.auth.clone())
    }

    pub fn sync_data(&self) -> SyncData {
        SyncData::new(Arc::clone(&self.sync_engine), self.auth.clone())
    }
}

impl fmt::Debug for AppContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContainer")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .field("sync_engine", &self.sync_engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSession;
    use crate::models::SyncStatus;
    use crate::remote::MemoryRemoteStore;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn signed_in() -> AuthState {
        AuthState::new(Some(AuthSession::new("user-1", "token")))
    }

    #[test]
    fn from_config_requires_base_url() {
        let result = AppContainer::from_config(CoreConfig::default(), signed_in());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn from_config_builds_http_remote() {
        let mut config = CoreConfig::default();
        config.remote.base_url = Some("https://api.example.com".to_string());

        let container = AppContainer::from_config(config, signed_in()).unwrap();
        assert!(container.auth().is_authenticated());
        assert_eq!(container.sync_engine().status(), SyncStatus::None);
    }

    #[tokio::test]
    async fn sqlite_backend_persists_between_containers() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CoreConfig::default();
        config.local.backend = LocalBackend::Sqlite;
        config.local.path = Some(dir.path().join("cache.db"));
        let remote = Arc::new(MemoryRemoteStore::<Task>::new());

        let first = AppContainer::with_remotes(
            config.clone(),
            signed_in(),
            remote.clone(),
            Arc::new(MemoryRemoteStore::<Category>::new()),
        )
        .unwrap();
        let created = first
            .create_task()
            .execute(Task::new("Survives restart"))
            .await
            .unwrap();

        remote.set_offline(true);
        let second = AppContainer::with_remotes(
            config,
            signed_in(),
            remote,
            Arc::new(MemoryRemoteStore::<Category>::new()),
        )
        .unwrap();
        let tasks = second.get_tasks().execute().await.unwrap();
        assert_eq!(tasks, vec![created]);
    }

    #[tokio::test]
    async fn auto_sync_can_be_restarted_and_stopped() {
        let mut config = CoreConfig::default();
        config.sync.auto_sync_interval_secs = 3600;
        let remote = Arc::new(MemoryRemoteStore::<Task>::new());
        let container = AppContainer::with_remotes(
            config,
            signed_in(),
            remote.clone(),
            Arc::new(MemoryRemoteStore::<Category>::new()),
        )
        .unwrap();

        container.start_auto_sync();
        container.start_auto_sync();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let handle = container.stop_auto_sync().unwrap();
        handle.shutdown().await;
        assert!(container.stop_auto_sync().is_none());
        assert_eq!(container.sync_engine().status(), SyncStatus::Synced);
        assert!(remote.calls().list >= 1);
    }
}
