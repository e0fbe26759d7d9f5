use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{
    access::{Principal, Role},
    config::{AppConfig, Env},
    error::{AppError, AuthError, StoreError},
    models::UserProfile,
    repository::RepositoryState,
};

/// Claims
///
/// The subset of a Supabase access token this service relies on. Tokens are HS256
/// signed with the project's JWT secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the `auth.users.id`, also the key of `public.profiles`.
    pub sub: Uuid,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// issue_token
///
/// Mints an HS256 access token in the Supabase shape. Used by the in-process auth
/// service and by tests.
pub fn issue_token(
    user_id: Uuid,
    email: Option<&str>,
    secret: &str,
    ttl_secs: usize,
) -> Result<String, AuthError> {
    let iat = now_secs();
    let claims = Claims {
        sub: user_id,
        exp: iat + ttl_secs,
        iat,
        email: email.map(str::to_string),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Unavailable(e.to_string()))
}

/// decode_token
///
/// Validates signature and expiry. Every failure surfaces as `ExpiredToken`: the
/// caller has to sign in again either way.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // Supabase sets `aud: authenticated`; the signature already binds the project.
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("access token expired"),
                other => tracing::debug!("access token rejected: {:?}", other),
            }
            AuthError::ExpiredToken
        })
}

/// AuthUser
///
/// The resolved identity of a request: who the caller is and the role their
/// profile carries right now.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// The bearer token the identity was resolved from. Absent for the local bypass.
    pub access_token: Option<String>,
}

impl AuthUser {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl Principal for AuthUser {
    fn role(&self) -> Role {
        self.role
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Browsers are redirected to the login view; API clients asking for JSON get a 401.
pub fn wants_redirect(headers: &HeaderMap) -> bool {
    !headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// resolve_session
///
/// Turns request headers into an optional identity:
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing profile.
/// 2. Bearer token: HS256 validation, then a profile lookup for the current role.
///
/// Missing, invalid or expired tokens and deleted profiles all yield `Ok(None)`.
/// Only a failing content store is an error.
pub async fn resolve_session(
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<AuthUser>, StoreError> {
    if config.env == Env::Local {
        let bypass_id = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(user_id) = bypass_id {
            if let Some(profile) = repo.get_profile(user_id).await? {
                return Ok(Some(AuthUser {
                    id: profile.id,
                    email: profile.email.clone(),
                    role: profile.role(),
                    access_token: None,
                }));
            }
        }
    }

    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    let Ok(claims) = decode_token(token, &config.jwt_secret) else {
        return Ok(None);
    };

    // A valid token for a deleted profile carries no identity.
    let Some(profile) = repo.get_profile(claims.sub).await? else {
        tracing::warn!(user_id = %claims.sub, "token subject has no profile");
        return Ok(None);
    };

    Ok(Some(AuthUser {
        id: profile.id,
        email: profile.email.clone(),
        role: profile.role(),
        access_token: Some(token.to_string()),
    }))
}

/// AuthUser Extractor
///
/// Reuses an identity already resolved by the admin gate (request extensions),
/// otherwise resolves it from the headers. Rejects with `AppError::Unauthenticated`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_session(&parts.headers, &repo, &config)
            .await?
            .ok_or_else(|| AppError::Unauthenticated {
                redirect: wants_redirect(&parts.headers),
            })
    }
}

/// MaybeAuthUser
///
/// For public routes that render differently for signed-in callers.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(MaybeAuthUser(Some(user.clone())));
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        Ok(MaybeAuthUser(
            resolve_session(&parts.headers, &repo, &config).await?,
        ))
    }
}
