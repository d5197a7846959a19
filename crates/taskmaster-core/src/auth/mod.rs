//! Explicit authentication state threaded into remote store calls.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// A signed-in principal and the bearer credential scoping remote access.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Unix seconds; `None` means the token does not expire
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl AuthSession {
    #[must_use]
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
            email: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            expires_at <= chrono::Utc::now().timestamp() + EXPIRY_SKEW_SECONDS
        })
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Shared holder for the current session (present or absent).
///
/// Constructed once by the application container and handed to whatever
/// needs to read the principal; nothing queries a global.
#[derive(Clone, Default)]
pub struct AuthState {
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl AuthState {
    pub fn new(session: Option<AuthSession>) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, session: AuthSession) {
        tracing::debug!("Signed in as {}", session.user_id);
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn sign_out(&self) {
        tracing::debug!("Signed out");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Snapshot of the current session, if any.
    pub fn current(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthState")
            .field("session", &self.current())
            .finish()
    }
}
