use crate::{AppState, handlers::account};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any signed-in identity, including role `none`. Wrapped in the
/// authentication middleware by `create_router`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/me", get(account::get_me))
        .route("/auth/logout", post(account::logout))
        // POST /auth/password
        // First password for invited users.
        .route("/auth/password", post(account::set_password))
}
