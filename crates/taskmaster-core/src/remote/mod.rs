//! Remote document store clients
//!
//! The remote store is the authoritative per-user collection. Every document
//! lives at `users/{userId}/{collection}/{id}` and access is scoped by the
//! caller's [`AuthSession`].

mod http;
mod memory;
mod subscription;

pub use http::HttpRemoteStore;
pub use memory::{CallCounts, MemoryRemoteStore};
pub use subscription::{watch_snapshots, SnapshotListener, Subscription};

use async_trait::async_trait;

use crate::auth::AuthSession;
use crate::error::Result;
use crate::models::Entity;

/// Authoritative, network-backed collection of one entity type.
///
/// Without a session, `list` and `get` return empty/absent while writes fail
/// with [`crate::Error::NotAuthenticated`]. Failures are reported as
/// `Network`, `PermissionDenied`, `NotFound` or `InvalidData` so callers can
/// decide whether to fall back to the cache.
#[async_trait]
pub trait RemoteStore<T: Entity>: Send + Sync {
    /// All documents of the signed-in user, newest `created_at` first
    async fn list(&self, session: Option<&AuthSession>) -> Result<Vec<T>>;

    async fn get(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<Option<T>>;

    async fn create(&self, session: Option<&AuthSession>, entity: T) -> Result<T>;

    /// Write `entity`, refreshing its last-modified stamp; returns the stored value
    async fn update(&self, session: Option<&AuthSession>, entity: T) -> Result<T>;

    async fn delete(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<()>;
}

/// `users/{userId}/{collection}`
pub fn collection_path<T: Entity>(user_id: &str) -> String {
    format!("users/{user_id}/{}", T::COLLECTION)
}

/// `users/{userId}/{collection}/{id}`
pub fn document_path<T: Entity>(user_id: &str, id: &T::Id) -> String {
    format!("{}/{id}", collection_path::<T>(user_id))
}
