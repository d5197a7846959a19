//! Periodic background sync
//!
//! The loop runs one sync immediately and then one per interval until its
//! handle is stopped. Stopping never interrupts a sync already in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{SyncEngine, SyncOutcome};
use crate::auth::AuthState;

/// Handle to a running auto-sync loop.
///
/// Dropping the handle stops the loop after any in-flight sync completes.
#[derive(Debug)]
pub struct AutoSyncHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl AutoSyncHandle {
    /// Stop scheduling further runs. An in-flight sync is left to finish.
    pub fn stop(&self) {
        self.cancel.send_replace(true);
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("Auto-sync loop ended abnormally: {}", error);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SyncEngine {
    /// Sync now and then every `interval` until the returned handle is stopped.
    ///
    /// The session is read from `auth` before each run, so signing in or out
    /// takes effect on the next tick.
    pub fn start_auto_sync(self: &Arc<Self>, auth: AuthState, interval: Duration) -> AutoSyncHandle {
        let engine = Arc::clone(self);
        let (cancel, mut cancelled) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!("Auto-sync started ({}s interval)", interval.as_secs());
            loop {
                if is_cancelled(&cancelled) {
                    break;
                }

                let session = auth.current();
                match engine.sync(session.as_ref()).await {
                    SyncOutcome::Synced(_) => {}
                    SyncOutcome::Failed(error) => {
                        tracing::debug!("Auto-sync run failed: {}", error);
                    }
                    SyncOutcome::AlreadyRunning => {
                        tracing::debug!("Auto-sync tick skipped, sync in progress");
                    }
                }

                if is_cancelled(&cancelled) {
                    break;
                }
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    _ = cancelled.changed() => break,
                }
            }
            tracing::info!("Auto-sync stopped");
        });

        AutoSyncHandle {
            cancel,
            task: Some(task),
        }
    }
}

fn is_cancelled(signal: &watch::Receiver<bool>) -> bool {
    *signal.borrow()
}
