use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization gate and listing filters.
pub mod access;
pub mod browse;
pub mod filter;

// Collaborators and the services built on them.
pub mod auth;
pub mod config;
pub mod cv;
pub mod error;
pub mod identity;
pub mod models;
pub mod realtime;
pub mod repository;
pub mod storage;
pub mod user_admin;

// Client side: typed API client and session mirror.
pub mod client;
pub mod session;

pub mod handlers;
pub mod routes;
use access::AccessDecision;
use auth::{AuthUser, resolve_session, wants_redirect};
use error::AppError;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{AuthState, MockAuthService, SupabaseAuthClient};
pub use realtime::ContactsFeed;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};
pub use user_admin::{MockUserManagement, SupabaseUserFunction, UserManagementState};

/// ApiDoc
///
/// OpenAPI document for every handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::public::get_about, handlers::public::get_experience, handlers::public::get_jobs,
        handlers::public::get_certificates, handlers::public::get_contacts,
        handlers::public::contacts_stream, handlers::public::list_posts,
        handlers::public::get_filter_options, handlers::public::get_post,
        handlers::public::admin_landing, handlers::public::login,
        handlers::account::get_me, handlers::account::logout, handlers::account::set_password,
        handlers::admin::get_dashboard, handlers::admin::get_about_form, handlers::admin::save_about,
        handlers::admin::list_jobs, handlers::admin::create_job, handlers::admin::update_job,
        handlers::admin::delete_job, handlers::admin::reorder_jobs,
        handlers::admin::list_certificates, handlers::admin::create_certificate,
        handlers::admin::update_certificate, handlers::admin::delete_certificate,
        handlers::admin::reorder_certificates,
        handlers::admin::list_all_posts, handlers::admin::create_post, handlers::admin::update_post,
        handlers::admin::delete_post,
        handlers::admin::get_contacts_form, handlers::admin::save_contacts,
        handlers::admin::list_users, handlers::admin::invite_user,
        handlers::admin::update_user_role, handlers::admin::delete_user,
        handlers::admin::list_images, handlers::admin::upload_image, handlers::admin::delete_image,
        handlers::admin::get_monetization_guide, handlers::admin::get_cv,
    ),
    components(
        schemas(
            access::Role, access::AdminSection,
            filter::SortKey, filter::FilterCriteria, filter::FilterOptions,
            models::UserProfile, models::LoginRequest, models::LoginResponse,
            models::SetPasswordRequest, models::AdminLanding, models::Dashboard,
            models::DashboardLink, models::BlogPost, models::PostSummary, models::BlogPostInput,
            models::ListInput, models::LooseInt,
            models::About, models::AboutInput, models::Job, models::JobInput,
            models::Certificate, models::CertificateInput, models::PositionUpdate,
            models::Experience, models::SocialLink, models::Contacts, models::ContactsInput,
            models::ImageObject, models::ManagedUser, models::InviteUserRequest,
            models::UpdateRoleRequest, models::GuideStep, models::MonetizationGuide,
            realtime::ChangeEvent, realtime::ChangeKind,
            cv::CvDocument, cv::CvContact, cv::CvJob, cv::CvCertificate,
        )
    ),
    tags(
        (name = "portfolio-cms", description = "Portfolio & blog content API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration. Every service is an
/// `Arc<dyn Trait>`, so cloning per request is cheap and handlers need no locks.
#[derive(Clone)]
pub struct AppState {
    /// Content store (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Image library (S3/MinIO/Supabase Storage).
    pub storage: StorageState,
    /// Authentication collaborator (Supabase GoTrue).
    pub auth: AuthState,
    /// Privileged user management (Supabase Edge Function).
    pub users: UserManagementState,
    /// Live contacts changes for SSE subscribers.
    pub contacts_feed: ContactsFeed,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for UserManagementState {
    fn from_ref(app_state: &AppState) -> UserManagementState {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for ContactsFeed {
    fn from_ref(app_state: &AppState) -> ContactsFeed {
        app_state.contacts_feed.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`: extracting `AuthUser` rejects with
/// `AppError::Unauthenticated` before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_gate
///
/// Guards `admin_routes` with both enforcement levels, keyed on the request path:
/// existence gating (no session: redirect to `/admin`, or 401 for JSON callers) and
/// capability gating (role outside the section's required set: 403). The resolved
/// identity is stashed in the request extensions for the handler's `AuthUser`.
async fn admin_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = resolve_session(request.headers(), &state.repo, &state.config).await?;
    let path = request.uri().path().to_string();

    match access::decide(&path, session.as_ref()) {
        AccessDecision::Allow => {
            if let Some(user) = session {
                request.extensions_mut().insert(user);
            }
            Ok(next.run(request).await)
        }
        AccessDecision::RedirectToLogin => {
            tracing::debug!(%path, "no session for admin path");
            Err(AppError::Unauthenticated {
                redirect: wants_redirect(request.headers()),
            })
        }
        AccessDecision::Deny => {
            if let Some(user) = &session {
                tracing::warn!(user_id = %user.id, role = %user.role, %path, "role lacks access to admin section");
            }
            Err(AppError::Forbidden)
        }
    }
}

/// create_router
///
/// Assembles the routers, applies the access layers and the observability stack, and
/// registers the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate)),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id`, so every log line of
/// one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
