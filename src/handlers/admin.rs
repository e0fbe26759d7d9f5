use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    access::visible_links,
    auth::AuthUser,
    cv::{CvDocument, build_cv},
    error::{AppError, LOGIN_PATH, StoreError, ValidationError},
    models::{
        About, AboutInput, BlogPost, BlogPostInput, Certificate, CertificateInput, Contacts,
        ContactsInput, Dashboard, DashboardLink, ImageObject, InviteUserRequest, Job, JobInput,
        ManagedUser, MonetizationGuide, PositionUpdate, UpdateRoleRequest,
    },
    realtime::{ChangeEvent, ChangeKind},
    user_admin::{UserAction, UserActionOutcome},
};

// --- Dashboard ---

/// get_dashboard
///
/// [Admin Route] The management links the caller's role opens. A role that opens
/// nothing is sent back to `/admin`.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Visible sections", body = Dashboard),
        (status = 303, description = "No section visible, back to /admin")
    )
)]
pub async fn get_dashboard(user: AuthUser) -> Response {
    let links: Vec<DashboardLink> = visible_links(Some(&user))
        .into_iter()
        .map(|link| DashboardLink {
            section: link.section,
            path: link.path.to_string(),
            title: link.title.to_string(),
            description: link.description.to_string(),
            required_roles: link.required_roles().to_vec(),
        })
        .collect();

    if links.is_empty() {
        tracing::info!(user_id = %user.id, "no admin section visible for role 'none'");
        return Redirect::to(LOGIN_PATH).into_response();
    }

    Json(Dashboard {
        user: user.profile(),
        links,
    })
    .into_response()
}

// --- About ---

/// get_about_form
///
/// [Admin Route] Current about record, or `null` before it has been written.
#[utoipa::path(
    get,
    path = "/admin/about",
    responses((status = 200, description = "About (nullable)", body = About))
)]
pub async fn get_about_form(State(state): State<AppState>) -> Result<Json<Option<About>>, AppError> {
    Ok(Json(state.repo.get_about().await?))
}

#[utoipa::path(
    put,
    path = "/admin/about",
    request_body = AboutInput,
    responses(
        (status = 200, description = "Saved", body = About),
        (status = 422, description = "Missing required field")
    )
)]
pub async fn save_about(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AboutInput>,
) -> Result<Json<About>, AppError> {
    let draft = payload.into_draft()?;
    let about = state.repo.save_about(draft, user.id).await?;
    tracing::info!(user_id = %user.id, "about updated");
    Ok(Json(about))
}

// --- Jobs ---

#[utoipa::path(
    get,
    path = "/admin/jobs",
    responses((status = 200, description = "Jobs", body = [Job]))
)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.repo.list_jobs().await?))
}

#[utoipa::path(
    post,
    path = "/admin/jobs",
    request_body = JobInput,
    responses(
        (status = 201, description = "Created", body = Job),
        (status = 422, description = "Invalid job")
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<JobInput>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let draft = payload.into_draft()?;
    let job = state.repo.create_job(draft).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    put,
    path = "/admin/jobs/{id}",
    request_body = JobInput,
    responses(
        (status = 200, description = "Updated", body = Job),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobInput>,
) -> Result<Json<Job>, AppError> {
    let draft = payload.into_draft()?;
    Ok(Json(state.repo.update_job(id, draft).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/jobs/{id}",
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_job(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// reorder_jobs
///
/// [Admin Route] Persists a new display order in one batch.
#[utoipa::path(
    put,
    path = "/admin/jobs/order",
    request_body = [PositionUpdate],
    responses((status = 204, description = "Reordered"), (status = 404, description = "Unknown id"))
)]
pub async fn reorder_jobs(
    State(state): State<AppState>,
    Json(updates): Json<Vec<PositionUpdate>>,
) -> Result<StatusCode, AppError> {
    state.repo.reorder_jobs(&updates).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Certificates ---

#[utoipa::path(
    get,
    path = "/admin/certificates",
    responses((status = 200, description = "Certificates", body = [Certificate]))
)]
pub async fn list_certificates(
    State(state): State<AppState>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    Ok(Json(state.repo.list_certificates().await?))
}

#[utoipa::path(
    post,
    path = "/admin/certificates",
    request_body = CertificateInput,
    responses(
        (status = 201, description = "Created", body = Certificate),
        (status = 422, description = "Invalid certificate")
    )
)]
pub async fn create_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CertificateInput>,
) -> Result<(StatusCode, Json<Certificate>), AppError> {
    let draft = payload.into_draft()?;
    let cert = state.repo.create_certificate(draft, user.id).await?;
    Ok((StatusCode::CREATED, Json(cert)))
}

#[utoipa::path(
    put,
    path = "/admin/certificates/{id}",
    request_body = CertificateInput,
    responses(
        (status = 200, description = "Updated", body = Certificate),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_certificate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CertificateInput>,
) -> Result<Json<Certificate>, AppError> {
    let draft = payload.into_draft()?;
    Ok(Json(state.repo.update_certificate(id, draft).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/certificates/{id}",
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_certificate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_certificate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/admin/certificates/order",
    request_body = [PositionUpdate],
    responses((status = 204, description = "Reordered"), (status = 404, description = "Unknown id"))
)]
pub async fn reorder_certificates(
    State(state): State<AppState>,
    Json(updates): Json<Vec<PositionUpdate>>,
) -> Result<StatusCode, AppError> {
    state.repo.reorder_certificates(&updates).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Blog ---

/// list_all_posts
///
/// [Admin Route] Every post including drafts, newest first.
#[utoipa::path(
    get,
    path = "/admin/blog",
    responses((status = 200, description = "All posts", body = [BlogPost]))
)]
pub async fn list_all_posts(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, AppError> {
    Ok(Json(state.repo.list_all_posts().await?))
}

#[utoipa::path(
    post,
    path = "/admin/blog",
    request_body = BlogPostInput,
    responses(
        (status = 201, description = "Created", body = BlogPost),
        (status = 422, description = "Missing required field")
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BlogPostInput>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    let draft = payload.into_draft()?;
    let post = state.repo.create_post(draft, user.id).await?;
    tracing::info!(post_id = %post.id, published = post.published, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    put,
    path = "/admin/blog/{id}",
    request_body = BlogPostInput,
    responses(
        (status = 200, description = "Updated", body = BlogPost),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlogPostInput>,
) -> Result<Json<BlogPost>, AppError> {
    let draft = payload.into_draft()?;
    Ok(Json(state.repo.update_post(id, draft).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/blog/{id}",
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Contacts ---

#[utoipa::path(
    get,
    path = "/admin/contacts",
    responses((status = 200, description = "Contacts (nullable)", body = Contacts))
)]
pub async fn get_contacts_form(
    State(state): State<AppState>,
) -> Result<Json<Option<Contacts>>, AppError> {
    Ok(Json(state.repo.get_contacts().await?))
}

/// save_contacts
///
/// [Admin Route] Writes the contacts record and pushes the new row to live subscribers.
#[utoipa::path(
    put,
    path = "/admin/contacts",
    request_body = ContactsInput,
    responses(
        (status = 200, description = "Saved", body = Contacts),
        (status = 422, description = "Invalid email")
    )
)]
pub async fn save_contacts(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ContactsInput>,
) -> Result<Json<Contacts>, AppError> {
    let draft = payload.into_draft()?;
    let existed = state.repo.get_contacts().await?.is_some();
    let contacts = state.repo.save_contacts(draft, user.id).await?;

    state.contacts_feed.publish(ChangeEvent {
        kind: if existed {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        },
        record: contacts.clone(),
    });

    Ok(Json(contacts))
}

// --- Users ---

#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Accounts", body = [ManagedUser]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<ManagedUser>>, AppError> {
    match state.users.invoke(UserAction::ListUsers).await? {
        UserActionOutcome::Users(users) => Ok(Json(users)),
        UserActionOutcome::Done => Ok(Json(Vec::new())),
    }
}

/// invite_user
///
/// [Admin Route] Sends an invitation e-mail. The link lands on the set-password view
/// unless the request names another target.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = InviteUserRequest,
    responses(
        (status = 202, description = "Invitation sent"),
        (status = 422, description = "Invalid email")
    )
)]
pub async fn invite_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InviteUserRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let redirect_to = payload
        .redirect_to
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("{}/set-password", state.config.site_url.trim_end_matches('/')));

    state
        .users
        .invoke(UserAction::Invite {
            email: payload.email.trim().to_string(),
            role: payload.role,
            redirect_to,
        })
        .await?;

    tracing::info!(invited_by = %user.id, role = %payload.role, "user invited");
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    request_body = UpdateRoleRequest,
    responses((status = 204, description = "Role updated"))
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<StatusCode, AppError> {
    state
        .users
        .invoke(UserAction::UpdateRole {
            user_id: id,
            role: payload.role,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_user
///
/// [Admin Route] Removes an account. Administrators cannot remove themselves.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 422, description = "Attempted self-deletion")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let action = UserAction::delete_user(user.id, id)?;
    state.users.invoke(action).await?;
    tracing::info!(deleted_by = %user.id, user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- Images ---

/// Upper bound for a single uploaded image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Room for boundaries and part headers on top of the image itself.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Request body limit for the upload route.
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + MULTIPART_OVERHEAD_BYTES;

/// list_images
///
/// [Admin Route] Images in the caller's namespace.
#[utoipa::path(
    get,
    path = "/admin/images",
    responses((status = 200, description = "Images", body = [ImageObject]))
)]
pub async fn list_images(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ImageObject>>, AppError> {
    Ok(Json(state.storage.list(&user.id.to_string()).await?))
}

fn invalid_file(reason: impl Into<String>) -> ValidationError {
    ValidationError::invalid("file", reason)
}

fn multipart_failure(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            limit: MAX_IMAGE_BYTES,
        }
    } else {
        invalid_file(err.body_text()).into()
    }
}

/// Stored name: a fresh UUID keeping the original extension.
fn stored_name(original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

/// upload_image
///
/// [Admin Route] Multipart upload; the `file` part must be an image.
#[utoipa::path(
    post,
    path = "/admin/images",
    request_body(content = String, content_type = "multipart/form-data", description = "`file` part"),
    responses(
        (status = 201, description = "Uploaded", body = ImageObject),
        (status = 413, description = "Image larger than 5 MB"),
        (status = 422, description = "Missing or non-image file")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageObject>), AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_failure)? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(invalid_file(format!("expected an image, got {content_type:?}")).into());
        }
        let name = stored_name(field.file_name());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_failure)? {
            if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(AppError::PayloadTooLarge {
                    limit: MAX_IMAGE_BYTES,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err(invalid_file("file is empty").into());
        }

        let url = state
            .storage
            .upload(&user.id.to_string(), &name, bytes, &content_type)
            .await?;
        tracing::info!(user_id = %user.id, %name, "image uploaded");
        return Ok((StatusCode::CREATED, Json(ImageObject { name, url })));
    }

    Err(ValidationError::required("file").into())
}

#[utoipa::path(
    delete,
    path = "/admin/images/{name}",
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not found"))
)]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.storage.delete(&user.id.to_string(), &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Monetization ---

/// get_monetization_guide
///
/// [Admin Route] Ad setup steps and how many posts have ads switched on.
#[utoipa::path(
    get,
    path = "/admin/monetization",
    responses((status = 200, description = "Guide", body = MonetizationGuide))
)]
pub async fn get_monetization_guide(
    State(state): State<AppState>,
) -> Result<Json<MonetizationGuide>, AppError> {
    let posts = state.repo.list_all_posts().await?;
    Ok(Json(MonetizationGuide::for_posts(&posts)))
}

// --- CV ---

/// get_cv
///
/// [Admin Route] CV assembled from about, contacts, jobs and certificates. Needs the
/// about record to exist.
#[utoipa::path(
    get,
    path = "/admin/cv-generator",
    responses(
        (status = 200, description = "CV", body = CvDocument),
        (status = 404, description = "About not yet written")
    )
)]
pub async fn get_cv(State(state): State<AppState>) -> Result<Json<CvDocument>, AppError> {
    let (about, contacts, jobs, certificates) = tokio::try_join!(
        state.repo.get_about(),
        state.repo.get_contacts(),
        state.repo.list_jobs(),
        state.repo.list_certificates(),
    )?;
    let about = about.ok_or(StoreError::NotFound)?;

    Ok(Json(build_cv(about, contacts, jobs, certificates)))
}
