use crate::{AppState, handlers::public};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Blog reads only ever return published posts;
/// drafts are filtered in the store query, not here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /about, /experience, /jobs, /certificates
        // Portfolio content for the home, about and experience pages.
        .route("/about", get(public::get_about))
        .route("/experience", get(public::get_experience))
        .route("/jobs", get(public::get_jobs))
        .route("/certificates", get(public::get_certificates))
        // GET /contacts and its live SSE feed (footer).
        .route("/contacts", get(public::get_contacts))
        .route("/contacts/stream", get(public::contacts_stream))
        // GET /blog?tag=&author=&search=&sort=
        .route("/blog", get(public::list_posts))
        // GET /blog/filters
        // Selector values, fetched once when the listing mounts.
        .route("/blog/filters", get(public::get_filter_options))
        .route("/blog/{id}", get(public::get_post))
        // GET /admin
        // Login form or dashboard hand-off; the only public path under /admin.
        .route("/admin", get(public::admin_landing))
        .route("/auth/login", post(public::login))
}
