use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AuthError},
    models::{SetPasswordRequest, UserProfile},
};

/// get_me
///
/// [Authenticated Route] The caller's identity with the role currently on their profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me(user: AuthUser) -> Json<UserProfile> {
    Json(user.profile())
}

/// logout
///
/// [Authenticated Route] Revokes the caller's session with the authentication service.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    // Bypass identities have no remote session to revoke.
    if let Some(token) = &user.access_token {
        state.auth.sign_out(token).await?;
    }
    tracing::info!(user_id = %user.id, "user signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// set_password
///
/// [Authenticated Route] Invited users choose their password here after following the
/// invitation link.
#[utoipa::path(
    post,
    path = "/auth/password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 422, description = "Too short or confirmation mismatch")
    )
)]
pub async fn set_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let token = user.access_token.as_deref().ok_or(AuthError::ExpiredToken)?;
    state.auth.update_password(token, &payload.password).await?;

    tracing::info!(user_id = %user.id, "password updated");
    Ok(StatusCode::NO_CONTENT)
}
