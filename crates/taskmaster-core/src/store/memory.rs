//! In-memory local store

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::LocalStore;
use crate::models::{sort_newest_first, Entity};

/// `HashMap`-backed cache, discarded with the process.
pub struct MemoryStore<T: Entity> {
    entries: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with `entities`.
    pub fn with_entities(entities: impl IntoIterator<Item = T>) -> Self {
        let store = Self::new();
        store.put_many(entities.into_iter().collect());
        store
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> LocalStore<T> for MemoryStore<T> {
    fn list(&self) -> Vec<T> {
        let mut entities: Vec<T> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        sort_newest_first(&mut entities);
        entities
    }

    fn get(&self, id: &T::Id) -> Option<T> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn put(&self, entity: T) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.id(), entity);
    }

    fn put_many(&self, entities: Vec<T>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for entity in entities {
            entries.insert(entity.id(), entity);
        }
    }

    fn delete(&self, id: &T::Id) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn replace_all(&self, entities: Vec<T>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        for entity in entities {
            entries.insert(entity.id(), entity);
        }
    }
}
