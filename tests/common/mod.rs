#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use portfolio_cms::{
    AppConfig, AppState, ContactsFeed, MemoryRepository, MockAuthService, MockStorageService,
    MockUserManagement, auth::issue_token, create_router, identity::AuthState,
    models::{BlogPost, Profile}, repository::RepositoryState, storage::StorageState,
    user_admin::UserManagementState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse";

/// Every collaborator of an `AppState`, kept concrete so tests can inspect them.
pub struct TestContext {
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
    pub storage: Arc<MockStorageService>,
    pub auth: Arc<MockAuthService>,
    pub users: Arc<MockUserManagement>,
    pub feed: ContactsFeed,
}

pub fn test_context_with(repo: MemoryRepository, config: AppConfig) -> TestContext {
    let repo = Arc::new(repo);
    let storage = Arc::new(MockStorageService::new());
    let auth = Arc::new(MockAuthService::new(&config.jwt_secret));
    let users = Arc::new(MockUserManagement::new());
    let feed = ContactsFeed::new();

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: storage.clone() as StorageState,
        auth: auth.clone() as AuthState,
        users: users.clone() as UserManagementState,
        contacts_feed: feed.clone(),
        config,
    };

    TestContext {
        state,
        repo,
        storage,
        auth,
        users,
        feed,
    }
}

pub fn test_context() -> TestContext {
    test_context_with(MemoryRepository::new(), AppConfig::default())
}

impl TestContext {
    /// Creates a profile (and a matching sign-in account) with the given raw role.
    pub async fn seed_user(&self, email: &str, role: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.repo
            .insert_profile(Profile {
                id,
                email: email.to_string(),
                role: role.map(str::to_string),
            })
            .await;
        self.auth.add_account(id, email, PASSWORD).await;
        id
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        issue_token(user_id, None, &self.state.config.jwt_secret, 3600).unwrap()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn post(title: &str, excerpt: &str, author: &str, tags: &[&str]) -> BlogPost {
    BlogPost {
        id: Uuid::new_v4(),
        user_id: None,
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        content: String::new(),
        author: author.to_string(),
        publish_date: date(2024, 1, 1),
        read_time: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image_url: None,
        published: true,
        show_ads: false,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// Binds the full router on an ephemeral port and returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

/// A reqwest client that reports redirects instead of following them.
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
