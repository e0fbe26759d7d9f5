use async_trait::async_trait;
use portfolio_cms::{
    access::Role,
    error::AuthError,
    models::UserProfile,
    session::{Session, SessionContext, SessionProvider},
};
use std::sync::Arc;
use uuid::Uuid;

/// Accepts one password and can be told to fail sign-out.
struct StubProvider {
    role: Role,
    fail_sign_out: bool,
}

#[async_trait]
impl SessionProvider for StubProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if password != "secret" {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Session {
            user: UserProfile {
                id: Uuid::new_v4(),
                email: email.to_string(),
                role: self.role,
            },
            access_token: "token".to_string(),
            refresh_token: None,
        })
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        if self.fail_sign_out {
            Err(AuthError::Unavailable("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

fn context(role: Role, fail_sign_out: bool) -> SessionContext {
    SessionContext::new(Arc::new(StubProvider {
        role,
        fail_sign_out,
    }))
}

#[tokio::test]
async fn test_no_session_denies_everything() {
    let ctx = context(Role::Admin, false);

    assert!(ctx.current().is_none());
    assert!(!ctx.can_access(&Role::ALL));
}

#[tokio::test]
async fn test_failed_sign_in_keeps_existing_session() {
    let ctx = context(Role::Admin, false);
    let first = ctx.sign_in("a@example.com", "secret").await.unwrap();

    let result = ctx.sign_in("a@example.com", "wrong").await;

    assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
    assert_eq!(ctx.current(), Some(first));
}

#[tokio::test]
async fn test_sign_out_clears_even_when_remote_fails() {
    let ctx = context(Role::BlogEditor, true);
    ctx.sign_in("e@example.com", "secret").await.unwrap();
    assert!(ctx.can_access(&[Role::BlogEditor]));

    let result = ctx.sign_out().await;

    assert!(matches!(result, Err(AuthError::Unavailable(_))));
    assert!(ctx.current().is_none());
    assert!(!ctx.can_access(&[Role::BlogEditor]));
}

#[tokio::test]
async fn test_sign_out_without_session_is_noop() {
    let ctx = context(Role::Admin, true);
    assert!(ctx.sign_out().await.is_ok());
}

#[tokio::test]
async fn test_subscribers_observe_changes() {
    let ctx = context(Role::None, false);
    let mut rx = ctx.subscribe();

    ctx.sign_in("n@example.com", "secret").await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(
        rx.borrow_and_update().as_ref().map(|s| s.user.role),
        Some(Role::None)
    );

    // Clones share state.
    let clone = ctx.clone();
    clone.sign_out().await.unwrap();
    rx.changed().await.unwrap();
    assert!(rx.borrow().is_none());
}
