use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    access::visible_links,
    auth::MaybeAuthUser,
    error::{AppError, StoreError},
    filter::{FilterCriteria, FilterOptions, compose},
    models::{
        About, AdminLanding, BlogPost, Certificate, Contacts, Experience, Job, LoginRequest,
        LoginResponse, PostSummary, UserProfile,
    },
    realtime::ContactsFeed,
};

/// get_about
///
/// [Public Route] The personal profile shown on the home and about pages.
#[utoipa::path(
    get,
    path = "/about",
    responses(
        (status = 200, description = "About", body = About),
        (status = 404, description = "Not yet written")
    )
)]
pub async fn get_about(State(state): State<AppState>) -> Result<Json<About>, AppError> {
    let about = state.repo.get_about().await?.ok_or(StoreError::NotFound)?;
    Ok(Json(about))
}

/// get_experience
///
/// [Public Route] Jobs and certificates, each ordered by position.
#[utoipa::path(
    get,
    path = "/experience",
    responses((status = 200, description = "Experience", body = Experience))
)]
pub async fn get_experience(State(state): State<AppState>) -> Result<Json<Experience>, AppError> {
    let (jobs, certificates) =
        tokio::try_join!(state.repo.list_jobs(), state.repo.list_certificates())?;
    Ok(Json(Experience { jobs, certificates }))
}

#[utoipa::path(
    get,
    path = "/jobs",
    responses((status = 200, description = "Jobs", body = [Job]))
)]
pub async fn get_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.repo.list_jobs().await?))
}

#[utoipa::path(
    get,
    path = "/certificates",
    responses((status = 200, description = "Certificates", body = [Certificate]))
)]
pub async fn get_certificates(
    State(state): State<AppState>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    Ok(Json(state.repo.list_certificates().await?))
}

/// get_contacts
///
/// [Public Route] Contact details and social links for the footer.
#[utoipa::path(
    get,
    path = "/contacts",
    responses(
        (status = 200, description = "Contacts", body = Contacts),
        (status = 404, description = "Not yet written")
    )
)]
pub async fn get_contacts(State(state): State<AppState>) -> Result<Json<Contacts>, AppError> {
    let contacts = state.repo.get_contacts().await?.ok_or(StoreError::NotFound)?;
    Ok(Json(contacts))
}

/// contacts_stream
///
/// [Public Route] Server-sent events, one `contacts` event per change. The feed
/// subscription lives exactly as long as the connection.
#[utoipa::path(
    get,
    path = "/contacts/stream",
    responses((status = 200, description = "Event stream of ChangeEvent", content_type = "text/event-stream"))
)]
pub async fn contacts_stream(
    State(feed): State<ContactsFeed>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = feed.subscribe().into_stream().map(|event| {
        let json = serde_json::to_string(&event)
            .unwrap_or_else(|_| r#"{"error":"Failed to serialize event"}"#.to_string());
        Ok(Event::default().event("contacts").data(json))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// list_posts
///
/// [Public Route] Published posts matching the reader's filters.
#[utoipa::path(
    get,
    path = "/blog",
    params(FilterCriteria),
    responses((status = 200, description = "Matching posts", body = [PostSummary]))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(criteria): Query<FilterCriteria>,
) -> Result<Json<Vec<PostSummary>>, AppError> {
    let query = compose(&criteria);
    tracing::debug!(?criteria, "listing posts");
    Ok(Json(state.repo.query_posts(&query).await?))
}

/// get_filter_options
///
/// [Public Route] Tag and author values for the listing selectors.
#[utoipa::path(
    get,
    path = "/blog/filters",
    responses((status = 200, description = "Filter options", body = FilterOptions))
)]
pub async fn get_filter_options(
    State(state): State<AppState>,
) -> Result<Json<FilterOptions>, AppError> {
    Ok(Json(state.repo.filter_options().await?))
}

/// get_post
///
/// [Public Route] A single post. Drafts are indistinguishable from missing posts.
#[utoipa::path(
    get,
    path = "/blog/{id}",
    responses(
        (status = 200, description = "Post", body = BlogPost),
        (status = 404, description = "Not found or not published")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BlogPost>, AppError> {
    let post = state
        .repo
        .get_published_post(id)
        .await?
        .ok_or(StoreError::NotFound)?;
    Ok(Json(post))
}

/// admin_landing
///
/// [Public Route] `/admin` itself. Signed-out callers are told to show the login form;
/// signed-in callers are pointed at the dashboard, unless their role opens no section.
#[utoipa::path(
    get,
    path = "/admin",
    responses((status = 200, description = "Landing state", body = AdminLanding))
)]
pub async fn admin_landing(MaybeAuthUser(user): MaybeAuthUser) -> Json<AdminLanding> {
    let next = match &user {
        Some(u) if !visible_links(Some(u)).is_empty() => "/admin/dashboard",
        _ => "/admin",
    };
    Json(AdminLanding {
        authenticated: user.is_some(),
        user: user.map(|u| u.profile()),
        next: next.to_string(),
    })
}

/// login
///
/// [Public Route] Password sign-in against the authentication service. The role in the
/// response comes from the profile row, not from the token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Malformed request")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let tokens = state
        .auth
        .sign_in(payload.email.trim(), &payload.password)
        .await
        .inspect_err(|e| tracing::warn!(email = %payload.email, "sign-in failed: {}", e))?;

    let role = state
        .repo
        .get_profile(tokens.user_id)
        .await?
        .map(|p| p.role())
        .unwrap_or_default();

    tracing::info!(user_id = %tokens.user_id, %role, "user signed in");

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserProfile {
            id: tokens.user_id,
            email: tokens.email,
            role,
        },
    }))
}
