use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{decode_token, issue_token},
    error::AuthError,
};

/// AuthTokens
///
/// What a successful password sign-in yields. The role is not part of it: roles live
/// on the profile row and are looked up separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user_id: Uuid,
    pub email: String,
}

/// AuthService
///
/// The authentication collaborator. Tokens it issues are validated locally by the
/// `AuthUser` extractor, so only the state-changing calls go through this trait.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
    async fn update_password(&self, access_token: &str, new_password: &str)
    -> Result<(), AuthError>;
}

pub type AuthState = Arc<dyn AuthService>;

// --- Supabase GoTrue ---

/// SupabaseAuthClient
///
/// `AuthService` over the Supabase Auth (GoTrue) REST API.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct GoTrueSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: GoTrueUser,
}

fn unavailable(err: reqwest::Error) -> AuthError {
    tracing::error!("auth service request failed: {}", err);
    AuthError::Unavailable(err.to_string())
}

async fn unexpected(response: reqwest::Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(%status, "auth service error: {}", body);
    AuthError::Unavailable(format!("auth service responded {status}"))
}

impl SupabaseAuthClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthService for SupabaseAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let response = self
            .http
            .post(self.url("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => {
                let session: GoTrueSession = response.json().await.map_err(unavailable)?;
                Ok(AuthTokens {
                    access_token: session.access_token,
                    refresh_token: session.refresh_token,
                    expires_in: session.expires_in,
                    user_id: session.user.id,
                    email: session.user.email.unwrap_or_else(|| email.to_string()),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(AuthError::InvalidCredentials)
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::ExpiredToken),
            _ => Err(unexpected(response).await),
        }
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let response = self
            .http
            .put(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::ExpiredToken),
            _ => Err(unexpected(response).await),
        }
    }
}

// --- In-process implementation ---

#[derive(Clone)]
struct Account {
    id: Uuid,
    password: String,
}

/// MockAuthService
///
/// Accounts held in memory. Issued tokens are real HS256 JWTs signed with the
/// configured secret, so they pass the `AuthUser` extractor unchanged.
#[derive(Clone)]
pub struct MockAuthService {
    secret: String,
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    revoked: Arc<Mutex<Vec<String>>>,
    /// When true, every call fails as if the service were unreachable.
    pub should_fail: bool,
}

const MOCK_TOKEN_TTL_SECS: usize = 3600;

impl MockAuthService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            accounts: Arc::default(),
            revoked: Arc::default(),
            should_fail: false,
        }
    }

    pub fn new_failing(secret: &str) -> Self {
        Self {
            should_fail: true,
            ..Self::new(secret)
        }
    }

    pub async fn add_account(&self, id: Uuid, email: &str, password: &str) {
        self.accounts.lock().await.insert(
            email.to_lowercase(),
            Account {
                id,
                password: password.to_string(),
            },
        );
    }

    pub async fn is_revoked(&self, token: &str) -> bool {
        self.revoked.lock().await.iter().any(|t| t == token)
    }

    fn check(&self) -> Result<(), AuthError> {
        if self.should_fail {
            Err(AuthError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    async fn authorize(&self, token: &str) -> Result<Uuid, AuthError> {
        if self.is_revoked(token).await {
            return Err(AuthError::ExpiredToken);
        }
        Ok(decode_token(token, &self.secret)?.sub)
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        self.check()?;
        let account = self
            .accounts
            .lock()
            .await
            .get(&email.to_lowercase())
            .cloned()
            .filter(|account| account.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(AuthTokens {
            access_token: issue_token(account.id, Some(email), &self.secret, MOCK_TOKEN_TTL_SECS)?,
            refresh_token: None,
            expires_in: Some(MOCK_TOKEN_TTL_SECS as i64),
            user_id: account.id,
            email: email.to_string(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.check()?;
        self.authorize(access_token).await?;
        self.revoked.lock().await.push(access_token.to_string());
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.check()?;
        let user_id = self.authorize(access_token).await?;
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .values_mut()
            .find(|account| account.id == user_id)
            .ok_or(AuthError::ExpiredToken)?;
        account.password = new_password.to_string();
        Ok(())
    }
}
