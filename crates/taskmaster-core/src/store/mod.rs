//! Local cache stores
//!
//! The local store is the device-side copy of the user's entities: the
//! fallback for reads when the remote store is unreachable and the
//! write-through target after successful remote writes. Calls are
//! synchronous and never fail from the caller's point of view.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{LocalDatabase, SqliteStore};

use crate::models::Entity;

/// Keyed cache of one entity type.
///
/// Implementations own their copies: values are cloned in on write and out on
/// read, so nothing is shared by reference with the remote store.
pub trait LocalStore<T: Entity>: Send + Sync {
    /// All cached entities, newest `created_at` first
    fn list(&self) -> Vec<T>;

    fn get(&self, id: &T::Id) -> Option<T>;

    /// Insert or replace by id
    fn put(&self, entity: T);

    fn put_many(&self, entities: Vec<T>);

    fn delete(&self, id: &T::Id);

    fn clear(&self);

    /// Replace the entire cache contents with `entities`.
    fn replace_all(&self, entities: Vec<T>) {
        self.clear();
        self.put_many(entities);
    }
}
