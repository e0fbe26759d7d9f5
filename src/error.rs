use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::borrow::Cow;
use thiserror::Error;
use validator::ValidationErrors;

/// AuthError
///
/// Failures reported by the authentication collaborator (Supabase GoTrue) or by
/// local token validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("session token is expired or invalid")]
    ExpiredToken,

    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

/// StoreError
///
/// Failures reported by the content store, the file store or the privileged
/// user-management function.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("record not found")]
    NotFound,

    #[error("network failure: {0}")]
    Network(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StoreError::Constraint(db.message().to_string())
            }
            sqlx::Error::Io(e) => StoreError::Network(e.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Network("connection pool unavailable".to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            StoreError::Network(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

/// ValidationError
///
/// Client-side required-field and format checks. A payload that fails these checks
/// is rejected before any collaborator is called.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(Cow<'static, str>),

    #[error("{field}: {reason}")]
    Invalid {
        field: Cow<'static, str>,
        reason: String,
    },
}

/// Error code the field rules use for a missing value.
pub const REQUIRED: &str = "required";

impl ValidationError {
    pub fn required(field: impl Into<Cow<'static, str>>) -> Self {
        ValidationError::Required(field.into())
    }

    pub fn invalid(field: impl Into<Cow<'static, str>>, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required(field) | ValidationError::Invalid { field, .. } => field,
        }
    }
}

/// Reports one failing field. Fields are taken in name order so the answer does not
/// depend on map iteration, and a missing value wins over a malformed one.
impl From<ValidationErrors> for ValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|(a, _), (b, _)| a.cmp(b));

        let Some((field, failures)) = fields.into_iter().next() else {
            return ValidationError::invalid("payload", errors.to_string());
        };
        let field: Cow<'static, str> = field.into();

        if failures.iter().any(|failure| failure.code == REQUIRED) {
            return ValidationError::Required(field);
        }
        let reason = failures
            .first()
            .map(|failure| match &failure.message {
                Some(message) => message.to_string(),
                None => failure.code.to_string(),
            })
            .unwrap_or_else(|| "invalid value".to_string());
        ValidationError::Invalid { field, reason }
    }
}

/// AppError
///
/// The error type returned by every fallible handler. Each variant maps onto a
/// single HTTP status; the body is always `{ "error": "<message>" }` except for the
/// login redirect.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// No session. Browsers are sent back to the login view, JSON clients get a 401.
    #[error("authentication required")]
    Unauthenticated { redirect: bool },

    #[error("insufficient role for this section")]
    Forbidden,

    #[error("file exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: usize },
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

/// Where unauthenticated browsers land: the public admin page renders the login form.
pub const LOGIN_PATH: &str = "/admin";

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(AuthError::InvalidCredentials | AuthError::ExpiredToken) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Auth(AuthError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            AppError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Constraint(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Network(_)) => StatusCode::BAD_GATEWAY,
            AppError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthenticated { redirect: true } => StatusCode::SEE_OTHER,
            AppError::Unauthenticated { redirect: false } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl AppError {
    /// Client-facing text for 5xx responses.
    fn public_message(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication service unavailable",
            AppError::Store(StoreError::Network(_)) => "upstream service unavailable",
            _ => "internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Unauthenticated { redirect: true } = self {
            return Redirect::to(LOGIN_PATH).into_response();
        }

        let status = self.status();
        let message = if status.is_server_error() {
            // Backend detail stays in the log.
            tracing::error!(error = %self, "request failed");
            self.public_message().to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
