use crate::{
    AppState,
    handlers::admin::{self, MAX_UPLOAD_BODY_BYTES},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, put},
};

/// Admin Router Module
///
/// Every management section, mounted with full `/admin/...` paths so the role gate
/// sees the same path the section table is keyed on. `create_router` wraps the whole
/// router in `admin_gate`: no session means a redirect to `/admin` (401 for JSON
/// callers), a role outside the section's required set means 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Any session; an empty link set redirects back to /admin.
        .route("/admin/dashboard", get(admin::get_dashboard))
        // --- admin only ---
        .route(
            "/admin/about",
            get(admin::get_about_form).put(admin::save_about),
        )
        .route(
            "/admin/jobs",
            get(admin::list_jobs).post(admin::create_job),
        )
        .route("/admin/jobs/order", put(admin::reorder_jobs))
        .route(
            "/admin/jobs/{id}",
            put(admin::update_job).delete(admin::delete_job),
        )
        .route(
            "/admin/certificates",
            get(admin::list_certificates).post(admin::create_certificate),
        )
        .route("/admin/certificates/order", put(admin::reorder_certificates))
        .route(
            "/admin/certificates/{id}",
            put(admin::update_certificate).delete(admin::delete_certificate),
        )
        .route(
            "/admin/contacts",
            get(admin::get_contacts_form).put(admin::save_contacts),
        )
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::invite_user),
        )
        .route("/admin/users/{id}/role", put(admin::update_user_role))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route("/admin/monetization", get(admin::get_monetization_guide))
        .route("/admin/cv-generator", get(admin::get_cv))
        // --- admin and blog-editor ---
        .route(
            "/admin/blog",
            get(admin::list_all_posts).post(admin::create_post),
        )
        .route(
            "/admin/blog/{id}",
            put(admin::update_post).delete(admin::delete_post),
        )
        .route(
            "/admin/images",
            get(admin::list_images)
                .post(admin::upload_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/admin/images/{name}", delete(admin::delete_image))
}
