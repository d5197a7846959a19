//! Read-through/write-through repositories
//!
//! A [`Repository`] pairs the local cache with the remote store for one
//! entity type. Reads prefer the remote list and fall back to the cache when
//! the remote is unavailable; writes go to the remote first and are cached
//! only once the remote accepted them.

use std::fmt;
use std::sync::Arc;

use crate::auth::AuthSession;
use crate::error::Result;
use crate::models::{Category, CategoryId, Entity, Task};
use crate::remote::RemoteStore;
use crate::store::LocalStore;

pub type TaskRepository = Repository<Task>;
pub type CategoryRepository = Repository<Category>;

/// Unified access to one entity type across the cache and the remote store.
pub struct Repository<T: Entity> {
    local: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteStore<T>>,
}

impl<T: Entity> Repository<T> {
    pub fn new(local: Arc<dyn LocalStore<T>>, remote: Arc<dyn RemoteStore<T>>) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &Arc<dyn LocalStore<T>> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore<T>> {
        &self.remote
    }

    /// All entities, newest first.
    ///
    /// A successful remote read is cached. When the remote fails, a non-empty
    /// cache is returned instead; an empty cache surfaces the remote error.
    pub async fn list(&self, session: Option<&AuthSession>) -> Result<Vec<T>> {
        match self.remote.list(session).await {
            Ok(entities) => {
                self.local.put_many(entities.clone());
                Ok(entities)
            }
            Err(error) => {
                let cached = self.local.list();
                if cached.is_empty() {
                    return Err(error);
                }
                tracing::warn!(
                    "Remote {} list failed, serving {} cached: {}",
                    T::KIND,
                    cached.len(),
                    error
                );
                Ok(cached)
            }
        }
    }

    /// Cache first; the remote is only asked on a cache miss.
    pub async fn get(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<Option<T>> {
        if let Some(cached) = self.local.get(id) {
            return Ok(Some(cached));
        }

        let fetched = self.remote.get(session, id).await?;
        if let Some(entity) = &fetched {
            tracing::debug!("Caching fetched {} {}", T::KIND, id);
            self.local.put(entity.clone());
        }
        Ok(fetched)
    }

    pub async fn create(&self, session: Option<&AuthSession>, entity: T) -> Result<T> {
        entity.validate()?;
        let created = self.remote.create(session, entity).await?;
        self.local.put(created.clone());
        tracing::debug!("Created {} {}", T::KIND, created.id());
        Ok(created)
    }

    /// Push `entity` to the remote and cache the server-stamped result.
    pub async fn update(&self, session: Option<&AuthSession>, entity: T) -> Result<T> {
        entity.validate()?;
        let updated = self.remote.update(session, entity).await?;
        self.local.put(updated.clone());
        tracing::debug!("Updated {} {}", T::KIND, updated.id());
        Ok(updated)
    }

    /// Remote delete, then evict. A failed remote delete keeps the cached copy.
    pub async fn delete(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<()> {
        self.remote.delete(session, id).await?;
        self.local.delete(id);
        tracing::debug!("Deleted {} {}", T::KIND, id);
        Ok(())
    }
}

impl Repository<Task> {
    /// Tasks whose title or description contains `query`, ignoring case.
    pub async fn search(&self, session: Option<&AuthSession>, query: &str) -> Result<Vec<Task>> {
        let tasks = self.list(session).await?;
        if query.trim().is_empty() {
            return Ok(tasks);
        }
        Ok(tasks
            .into_iter()
            .filter(|task| task.matches_query(query))
            .collect())
    }

    pub async fn list_by_category(
        &self,
        session: Option<&AuthSession>,
        category_id: &CategoryId,
    ) -> Result<Vec<Task>> {
        let tasks = self.list(session).await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.category_id.as_ref() == Some(category_id))
            .collect())
    }
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            remote: Arc::clone(&self.remote),
        }
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &T::COLLECTION)
            .finish_non_exhaustive()
    }
}
