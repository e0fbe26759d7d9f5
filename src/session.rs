//! Client-side session context.
//!
//! The session is owned by the authentication collaborator; this context only mirrors
//! it. `sign_in` and `sign_out` are the sole ways the mirrored value changes, and every
//! change is pushed to subscribers over a `watch` channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    access::{self, Principal, Role},
    error::AuthError,
    models::UserProfile,
};

/// Session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Principal for Session {
    fn role(&self) -> Role {
        self.user.role
    }
}

/// SessionProvider
///
/// Where sessions come from, typically `client::ApiClient`.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// SessionContext
///
/// Passed explicitly to whatever needs the current identity. Cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    provider: Arc<dyn SessionProvider>,
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            provider,
            tx: Arc::new(tx),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every sign-in and sign-out from now on.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn can_access(&self, required_roles: &[Role]) -> bool {
        access::can_access(self.tx.borrow().as_ref(), required_roles)
    }

    /// On failure the current session, if any, is left untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_in(email, password).await?;
        tracing::info!(user_id = %session.user.id, role = %session.user.role, "signed in");
        self.tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// sign_out
    ///
    /// The local session is cleared even when the remote call fails; the error is
    /// still returned so the caller can report it.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        let result = self.provider.sign_out(&session).await;
        if let Err(e) = &result {
            tracing::warn!("remote sign-out failed: {}", e);
        }
        self.tx.send_replace(None);
        result
    }
}
