//! Shared contract for entities kept in both the local cache and the remote store

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// An entity addressable by id in a per-user remote collection and cacheable
/// locally.
pub trait Entity:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Identifier type, stable for the lifetime of the entity
    type Id: Copy + Eq + Hash + Ord + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Remote collection name under `users/{userId}/`
    const COLLECTION: &'static str;

    /// Human-readable kind used in error messages
    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    fn created_at(&self) -> DateTime<Utc>;

    /// Check the entity's invariants before it is written anywhere.
    fn validate(&self) -> Result<()>;

    /// Refresh the last-modified stamp as part of a remote update.
    ///
    /// Entities without a modification timestamp keep the default no-op.
    fn stamp_updated(&mut self, _now: DateTime<Utc>) {}
}

/// Order entities newest `created_at` first, ties broken by id.
pub(crate) fn sort_newest_first<T: Entity>(entities: &mut [T]) {
    entities.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
}
