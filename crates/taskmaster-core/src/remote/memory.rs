//! In-process remote document store
//!
//! Behaves like the hosted document database (per-user collections, auth
//! gating, server-side update stamping, push listeners) and adds knobs for
//! simulating connectivity loss and rejected requests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::subscription::DeliveryGate;
use super::{collection_path, document_path, RemoteStore, SnapshotListener, Subscription};
use crate::auth::AuthSession;
use crate::error::{Error, Result};
use crate::models::{sort_newest_first, Entity};
use crate::util::now_millis;

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

struct Listener<T> {
    id: u64,
    user_id: String,
    callback: SnapshotListener<T>,
    gate: DeliveryGate,
}

struct RemoteState<T> {
    /// Keyed by full document path
    documents: BTreeMap<String, T>,
    offline: bool,
    denied_users: HashSet<String>,
    injected_failures: VecDeque<Error>,
    calls: CallCounts,
}

impl<T: Entity> RemoteState<T> {
    fn check_reachable(&mut self, user_id: &str) -> Result<()> {
        if let Some(error) = self.injected_failures.pop_front() {
            return Err(error);
        }
        if self.offline {
            return Err(Error::Network("remote store is unreachable".into()));
        }
        if self.denied_users.contains(user_id) {
            return Err(Error::PermissionDenied(format!(
                "user {user_id} may not access {}",
                T::COLLECTION
            )));
        }
        Ok(())
    }

    fn snapshot(&self, user_id: &str) -> Vec<T> {
        let prefix = format!("{}/", collection_path::<T>(user_id));
        let mut entities: Vec<T> = self
            .documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(_, entity)| entity.clone())
            .collect();
        sort_newest_first(&mut entities);
        entities
    }
}

/// Remote store kept in process memory.
pub struct MemoryRemoteStore<T: Entity> {
    state: Mutex<RemoteState<T>>,
    listeners: Arc<Mutex<Vec<Listener<T>>>>,
    next_listener_id: AtomicU64,
    latency: Option<Duration>,
}

impl<T: Entity> MemoryRemoteStore<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RemoteState {
                documents: BTreeMap::new(),
                offline: false,
                denied_users: HashSet::new(),
                injected_failures: VecDeque::new(),
                calls: CallCounts::default(),
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
            latency: None,
        }
    }

    /// Delay every operation by `latency` before it is served.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Make every subsequent call fail with a network error until reset.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Fail the next reachable call with `error`. Failures queue in order.
    pub fn fail_next(&self, error: Error) {
        self.lock().injected_failures.push_back(error);
    }

    /// Reject every call made on behalf of `user_id`.
    pub fn deny_user(&self, user_id: impl Into<String>) {
        self.lock().denied_users.insert(user_id.into());
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn reset_calls(&self) {
        self.lock().calls = CallCounts::default();
    }

    /// Store documents directly, bypassing auth, stamping and call counting.
    pub fn seed(&self, user_id: &str, entities: impl IntoIterator<Item = T>) {
        {
            let mut state = self.lock();
            for entity in entities {
                state
                    .documents
                    .insert(document_path::<T>(user_id, &entity.id()), entity);
            }
        }
        self.notify(user_id);
    }

    /// Current documents of `user_id`, bypassing auth and call counting.
    pub fn documents(&self, user_id: &str) -> Vec<T> {
        self.lock().snapshot(user_id)
    }

    /// Register a push listener for the session's collection.
    ///
    /// The listener is called immediately with the current snapshot and again
    /// after every write to that user's collection.
    pub fn subscribe(
        &self,
        session: Option<&AuthSession>,
        listener: SnapshotListener<T>,
    ) -> Result<Subscription> {
        let session = session.ok_or(Error::NotAuthenticated)?;
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let gate = DeliveryGate::default();

        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener {
                id,
                user_id: session.user_id.clone(),
                callback: Arc::clone(&listener),
                gate: gate.clone(),
            });
        let snapshot = self.documents(&session.user_id);
        gate.deliver(|| listener(&snapshot));

        let registry = Arc::downgrade(&self.listeners);
        Ok(Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|listener| listener.id != id);
            }
            gate.close();
        }))
    }

    fn notify(&self, user_id: &str) {
        let callbacks: Vec<(SnapshotListener<T>, DeliveryGate)> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|listener| listener.user_id == user_id)
            .map(|listener| (Arc::clone(&listener.callback), listener.gate.clone()))
            .collect();
        if callbacks.is_empty() {
            return;
        }

        let snapshot = self.documents(user_id);
        for (callback, gate) in callbacks {
            gate.deliver(|| callback(&snapshot));
        }
    }
}

impl<T: Entity> Default for MemoryRemoteStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> RemoteStore<T> for MemoryRemoteStore<T> {
    async fn list(&self, session: Option<&AuthSession>) -> Result<Vec<T>> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.list += 1;

        let Some(session) = session else {
            return Ok(Vec::new());
        };
        state.check_reachable(&session.user_id)?;
        Ok(state.snapshot(&session.user_id))
    }

    async fn get(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<Option<T>> {
        self.simulate_latency().await;
        let mut state = self.lock();
        state.calls.get += 1;

        let Some(session) = session else {
            return Ok(None);
        };
        state.check_reachable(&session.user_id)?;
        Ok(state
            .documents
            .get(&document_path::<T>(&session.user_id, id))
            .cloned())
    }

    async fn create(&self, session: Option<&AuthSession>, entity: T) -> Result<T> {
        self.simulate_latency().await;
        let user_id = {
            let mut state = self.lock();
            state.calls.create += 1;

            let session = session.ok_or(Error::NotAuthenticated)?;
            state.check_reachable(&session.user_id)?;
            state.documents.insert(
                document_path::<T>(&session.user_id, &entity.id()),
                entity.clone(),
            );
            session.user_id.clone()
        };

        self.notify(&user_id);
        Ok(entity)
    }

    async fn update(&self, session: Option<&AuthSession>, mut entity: T) -> Result<T> {
        self.simulate_latency().await;
        let user_id = {
            let mut state = self.lock();
            state.calls.update += 1;

            let session = session.ok_or(Error::NotAuthenticated)?;
            state.check_reachable(&session.user_id)?;

            let path = document_path::<T>(&session.user_id, &entity.id());
            let Some(stored) = state.documents.get_mut(&path) else {
                return Err(Error::NotFound(format!("{} {}", T::KIND, entity.id())));
            };
            entity.stamp_updated(now_millis());
            *stored = entity.clone();
            session.user_id.clone()
        };

        self.notify(&user_id);
        Ok(entity)
    }

    async fn delete(&self, session: Option<&AuthSession>, id: &T::Id) -> Result<()> {
        self.simulate_latency().await;
        let user_id = {
            let mut state = self.lock();
            state.calls.delete += 1;

            let session = session.ok_or(Error::NotAuthenticated)?;
            state.check_reachable(&session.user_id)?;
            if state
                .documents
                .remove(&document_path::<T>(&session.user_id, id))
                .is_none()
            {
                return Err(Error::NotFound(format!("{} {id}", T::KIND)));
            }
            session.user_id.clone()
        };

        self.notify(&user_id);
        Ok(())
    }
}
