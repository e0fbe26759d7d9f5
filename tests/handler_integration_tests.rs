mod common;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use common::{TestContext, post, test_context, test_context_with};
use portfolio_cms::{
    AppConfig, MemoryRepository,
    access::Role,
    auth::{AuthUser, MaybeAuthUser},
    error::{AppError, StoreError},
    filter::FilterCriteria,
    handlers::{account, admin, public},
    models::{
        AboutInput, BlogPostInput, ContactsInput, Dashboard, InviteUserRequest, JobInput,
        ListInput, LoginRequest, ManagedUser, PositionUpdate, SetPasswordRequest,
    },
    realtime::ChangeKind,
    storage::StorageService,
    user_admin::UserAction,
};
use uuid::Uuid;

fn user(role: Role) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        email: format!("{role}@example.com"),
        role,
        access_token: None,
    }
}

fn job_input(title: &str) -> JobInput {
    JobInput {
        title: title.to_string(),
        company: "Acme".to_string(),
        start_date: "2022-01".to_string(),
        description: "Shipping".to_string(),
        ..Default::default()
    }
}

async fn signed_in(ctx: &TestContext, role: &str) -> AuthUser {
    let id = ctx.seed_user(&format!("{role}@example.com"), Some(role)).await;
    AuthUser {
        id,
        email: format!("{role}@example.com"),
        role: role.parse().unwrap(),
        access_token: Some(ctx.token_for(id)),
    }
}

// --- Public ---

#[tokio::test]
async fn test_get_about_is_404_before_first_save() {
    let ctx = test_context();

    let err = public::get_about(State(ctx.state.clone())).await.unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_posts_only_returns_published_matches() {
    let ctx = test_context();
    let mut draft = post("Rust draft", "", "Ada", &["rust"]);
    draft.published = false;
    ctx.repo.insert_post(draft).await;
    ctx.repo.insert_post(post("Rust live", "", "Ada", &["rust"])).await;
    ctx.repo.insert_post(post("Cooking", "", "Ada", &["food"])).await;

    let criteria = FilterCriteria {
        tag: "rust".to_string(),
        ..Default::default()
    };
    let Json(posts) = public::list_posts(State(ctx.state.clone()), Query(criteria))
        .await
        .unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Rust live");
}

#[tokio::test]
async fn test_get_post_hides_drafts() {
    let ctx = test_context();
    let mut draft = post("Hidden", "", "Ada", &[]);
    draft.published = false;
    let id = draft.id;
    ctx.repo.insert_post(draft).await;

    let err = public::get_post(State(ctx.state.clone()), Path(id))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_bad_gateway() {
    let ctx = test_context_with(MemoryRepository::new_failing(), AppConfig::default());

    let err = public::get_experience(State(ctx.state.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Store(StoreError::Network(_))));
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_admin_landing_next_step() {
    let Json(anonymous) = public::admin_landing(MaybeAuthUser(None)).await;
    assert!(!anonymous.authenticated);
    assert_eq!(anonymous.next, "/admin");

    let Json(editor) = public::admin_landing(MaybeAuthUser(Some(user(Role::BlogEditor)))).await;
    assert!(editor.authenticated);
    assert_eq!(editor.next, "/admin/dashboard");

    let Json(no_role) = public::admin_landing(MaybeAuthUser(Some(user(Role::None)))).await;
    assert!(no_role.authenticated);
    assert_eq!(no_role.next, "/admin");
}

#[tokio::test]
async fn test_login_returns_profile_role() {
    let ctx = test_context();
    let id = ctx.seed_user("editor@example.com", Some("blog-editor")).await;

    let Json(response) = public::login(
        State(ctx.state.clone()),
        Json(LoginRequest {
            email: " editor@example.com ".to_string(),
            password: common::PASSWORD.to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.user.id, id);
    assert_eq!(response.user.role, Role::BlogEditor);
    assert!(!response.access_token.is_empty());
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let ctx = test_context();
    ctx.seed_user("admin@example.com", Some("admin")).await;

    let err = public::login(
        State(ctx.state.clone()),
        Json(LoginRequest {
            email: "admin@example.com".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_validation_skips_auth_service() {
    let ctx = test_context();

    let err = public::login(
        State(ctx.state.clone()),
        Json(LoginRequest {
            email: String::new(),
            password: String::new(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.repo.read_count(), 0);
}

// --- Account ---

#[tokio::test]
async fn test_logout_revokes_token() {
    let ctx = test_context();
    let caller = signed_in(&ctx, "admin").await;
    let token = caller.access_token.clone().unwrap();

    let status = account::logout(State(ctx.state.clone()), caller).await.unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(ctx.auth.is_revoked(&token).await);
}

#[tokio::test]
async fn test_set_password_needs_a_real_session() {
    let ctx = test_context();

    let err = account::set_password(
        State(ctx.state.clone()),
        user(Role::None),
        Json(SetPasswordRequest {
            password: "new-password".to_string(),
            confirm_password: "new-password".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_set_password_success() {
    let ctx = test_context();
    let caller = signed_in(&ctx, "none").await;

    let status = account::set_password(
        State(ctx.state.clone()),
        caller,
        Json(SetPasswordRequest {
            password: "new-password".to_string(),
            confirm_password: "new-password".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
}

// --- Dashboard ---

#[tokio::test]
async fn test_dashboard_lists_only_permitted_links() {
    let response = admin::get_dashboard(user(Role::BlogEditor)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let dashboard: Dashboard = serde_json::from_slice(&body).unwrap();
    let paths: Vec<String> = dashboard.links.into_iter().map(|l| l.path).collect();

    assert_eq!(paths, vec!["/admin/blog", "/admin/images"]);
}

#[tokio::test]
async fn test_dashboard_redirects_role_none() {
    let response = admin::get_dashboard(user(Role::None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin");
}

// --- Content writes ---

#[tokio::test]
async fn test_invalid_payload_never_reaches_store() {
    let ctx = test_context();

    let err = admin::create_job(
        State(ctx.state.clone()),
        Json(JobInput {
            title: String::new(),
            ..job_input("")
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.repo.write_count(), 0);
}

#[tokio::test]
async fn test_job_create_and_reorder() {
    let ctx = test_context();

    let (status, Json(first)) = admin::create_job(State(ctx.state.clone()), Json(job_input("First")))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let (_, Json(second)) = admin::create_job(State(ctx.state.clone()), Json(job_input("Second")))
        .await
        .unwrap();

    let status = admin::reorder_jobs(
        State(ctx.state.clone()),
        Json(vec![
            PositionUpdate { id: first.id, position: 1 },
            PositionUpdate { id: second.id, position: 0 },
        ]),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let Json(jobs) = public::get_jobs(State(ctx.state.clone())).await.unwrap();
    assert_eq!(jobs[0].title, "Second");
}

#[tokio::test]
async fn test_delete_missing_post_is_404() {
    let ctx = test_context();

    let err = admin::delete_post(State(ctx.state.clone()), Path(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_post_records_author() {
    let ctx = test_context();
    let caller = user(Role::BlogEditor);
    let caller_id = caller.id;

    let (status, Json(created)) = admin::create_post(
        State(ctx.state.clone()),
        caller,
        Json(BlogPostInput {
            title: "New".to_string(),
            excerpt: "Fresh".to_string(),
            author: "Ada".to_string(),
            publish_date: "2024-05-01".to_string(),
            published: true,
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.user_id, Some(caller_id));
}

#[tokio::test]
async fn test_save_about_twice_keeps_one_record() {
    let ctx = test_context();
    let input = || AboutInput {
        name: "Ada".to_string(),
        title: "Engineer".to_string(),
        description: "Hi".to_string(),
        long_description: "Hello".to_string(),
        skills: ListInput::Items(vec!["Rust".to_string()]),
        ..Default::default()
    };

    let Json(first) = admin::save_about(State(ctx.state.clone()), user(Role::Admin), Json(input()))
        .await
        .unwrap();
    let Json(second) = admin::save_about(State(ctx.state.clone()), user(Role::Admin), Json(input()))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_save_contacts_publishes_change() {
    let ctx = test_context();
    let mut sub = ctx.feed.subscribe();
    let input = |email: &str| ContactsInput {
        email: email.to_string(),
        ..Default::default()
    };

    admin::save_contacts(State(ctx.state.clone()), user(Role::Admin), Json(input("a@example.com")))
        .await
        .unwrap();
    admin::save_contacts(State(ctx.state.clone()), user(Role::Admin), Json(input("b@example.com")))
        .await
        .unwrap();

    let inserted = sub.recv().await.unwrap();
    let updated = sub.recv().await.unwrap();
    assert_eq!(inserted.kind, ChangeKind::Insert);
    assert_eq!(updated.kind, ChangeKind::Update);
    assert_eq!(updated.record.email, "b@example.com");
}

#[tokio::test]
async fn test_invalid_contacts_publish_nothing() {
    let ctx = test_context();
    let _sub = ctx.feed.subscribe();

    let result = admin::save_contacts(
        State(ctx.state.clone()),
        user(Role::Admin),
        Json(ContactsInput::default()),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(ctx.repo.write_count(), 0);
}

#[tokio::test]
async fn test_get_cv_requires_about() {
    let ctx = test_context();

    let err = admin::get_cv(State(ctx.state.clone())).await.unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// --- Users ---

#[tokio::test]
async fn test_invite_defaults_redirect_to_set_password() {
    let ctx = test_context_with(
        MemoryRepository::new(),
        AppConfig {
            site_url: "https://portfolio.example/".to_string(),
            ..AppConfig::default()
        },
    );

    let status = admin::invite_user(
        State(ctx.state.clone()),
        user(Role::Admin),
        Json(InviteUserRequest {
            email: " new@example.com ".to_string(),
            role: Role::BlogEditor,
            redirect_to: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(
        ctx.users.calls().await,
        vec![UserAction::Invite {
            email: "new@example.com".to_string(),
            role: Role::BlogEditor,
            redirect_to: "https://portfolio.example/set-password".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let ctx = test_context();
    let caller = user(Role::Admin);
    let own_id = caller.id;

    let err = admin::delete_user(State(ctx.state.clone()), caller, Path(own_id))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(ctx.users.calls().await.is_empty());
}

#[tokio::test]
async fn test_delete_other_user() {
    let ctx = test_context();
    let target = ManagedUser {
        id: Uuid::new_v4(),
        email: "old@example.com".to_string(),
        role: Some(Role::BlogEditor),
        created_at: None,
        last_sign_in_at: None,
    };
    // Clones share the same user list.
    let _ = (*ctx.users).clone().with_user(target.clone()).await;

    let status = admin::delete_user(State(ctx.state.clone()), user(Role::Admin), Path(target.id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let Json(remaining) = admin::list_users(State(ctx.state.clone())).await.unwrap();
    assert!(remaining.is_empty());
}

// --- Images ---

#[tokio::test]
async fn test_images_are_listed_per_user() {
    let ctx = test_context();
    let owner = user(Role::BlogEditor);
    let other = user(Role::BlogEditor);
    ctx.storage
        .upload(&owner.id.to_string(), "mine.png", vec![1], "image/png")
        .await
        .unwrap();
    ctx.storage
        .upload(&other.id.to_string(), "theirs.png", vec![1], "image/png")
        .await
        .unwrap();

    let Json(images) = admin::list_images(State(ctx.state.clone()), owner).await.unwrap();

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].name, "mine.png");
}

#[tokio::test]
async fn test_delete_missing_image_is_404() {
    let ctx = test_context();

    let err = admin::delete_image(
        State(ctx.state.clone()),
        user(Role::Admin),
        Path("nope.png".to_string()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
}

// --- Monetization ---

#[tokio::test]
async fn test_monetization_guide_counts_posts_with_ads() {
    let ctx = test_context();
    let mut with_ads = post("Sponsored", "", "Ada", &[]);
    with_ads.show_ads = true;
    let mut draft_with_ads = post("Draft", "", "Ada", &[]);
    draft_with_ads.show_ads = true;
    draft_with_ads.published = false;
    ctx.repo.insert_post(with_ads).await;
    ctx.repo.insert_post(draft_with_ads).await;
    ctx.repo.insert_post(post("Plain", "", "Ada", &[])).await;

    let Json(guide) = admin::get_monetization_guide(State(ctx.state.clone()))
        .await
        .unwrap();

    assert_eq!(guide.steps.len(), 3);
    assert_eq!(guide.posts_with_ads, 2);
    assert_eq!(guide.total_posts, 3);
}

// --- Error bodies ---

async fn error_body(err: AppError) -> (StatusCode, String) {
    let response = err.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json["error"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_server_errors_hide_backend_detail() {
    let (status, message) = error_body(
        StoreError::Backend("relation \"blog_posts\" does not exist".to_string()).into(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(message, "internal server error");

    let (status, message) =
        error_body(StoreError::Network("connection refused 10.0.0.5:5432".to_string()).into())
            .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!message.contains("10.0.0.5"));
}

#[tokio::test]
async fn test_client_errors_keep_their_message() {
    let (status, message) = error_body(StoreError::NotFound.into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message, "record not found");

    let (status, _) = error_body(AppError::PayloadTooLarge { limit: 10 }).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
