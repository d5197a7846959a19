//! Live snapshot subscriptions

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use super::RemoteStore;
use crate::auth::AuthState;
use crate::models::Entity;

/// Callback receiving the latest full snapshot of a collection.
pub type SnapshotListener<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// Serialises listener delivery against cancellation.
///
/// Closing waits for a delivery in progress, so nothing is delivered once
/// `close` has returned.
#[derive(Clone, Default)]
pub(crate) struct DeliveryGate {
    closed: Arc<Mutex<bool>>,
}

impl DeliveryGate {
    /// Run `deliver` unless the gate is closed. Returns whether it ran.
    pub(crate) fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return false;
        }
        deliver();
        true
    }

    pub(crate) fn close(&self) {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

/// Handle to a live subscription.
///
/// Cancelling (explicitly or by dropping the handle) unregisters the
/// listener; no callback is delivered after cancellation returns. A listener
/// must not cancel its own subscription.
pub struct Subscription {
    active: Arc<AtomicBool>,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn cancel(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Poll `remote` every `interval` and call `listener` whenever the snapshot
/// differs from the last one delivered.
///
/// Works with any remote store, including ones without push notifications.
/// Must be called from within a tokio runtime. Poll failures are logged and
/// retried on the next tick.
pub fn watch_snapshots<T: Entity>(
    remote: Arc<dyn RemoteStore<T>>,
    auth: AuthState,
    interval: Duration,
    listener: SnapshotListener<T>,
) -> Subscription {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let gate = DeliveryGate::default();
    let task_gate = gate.clone();

    tokio::spawn(async move {
        let mut last_delivered: Option<Vec<T>> = None;
        loop {
            let cancelled = *cancel_rx.borrow();
            if cancelled {
                break;
            }

            let session = auth.current();
            match remote.list(session.as_ref()).await {
                Ok(snapshot) => {
                    if last_delivered.as_ref() != Some(&snapshot) {
                        if !task_gate.deliver(|| listener(&snapshot)) {
                            break;
                        }
                        last_delivered = Some(snapshot);
                    }
                }
                Err(error) => {
                    tracing::warn!("Snapshot poll for {} failed: {}", T::COLLECTION, error);
                }
            }

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                _ = cancel_rx.changed() => break,
            }
        }
        tracing::debug!("Stopped watching {}", T::COLLECTION);
    });

    Subscription::new(move || {
        gate.close();
        cancel_tx.send_replace(true);
    })
}
