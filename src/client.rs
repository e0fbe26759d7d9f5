//! Typed HTTP client for the portfolio API.
//!
//! Public reads back `browse::BlogFeed` (via `PostSource`) and sign-in/out back
//! `session::SessionContext` (via `SessionProvider`). Admin calls take the session
//! explicitly.

use async_trait::async_trait;
use reqwest::{StatusCode, header, redirect};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    browse::{FetchRequest, PostSource},
    error::{AuthError, StoreError},
    filter::{FilterCriteria, FilterOptions},
    models::{BlogPost, Contacts, Dashboard, LoginRequest, LoginResponse, PostSummary, UserProfile},
    session::{Session, SessionProvider},
};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Constraint(body),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            StoreError::Network(body)
        }
        _ => StoreError::Backend(format!("{status}: {body}")),
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            // Redirects carry meaning (back to the login view); surface them.
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }

    pub async fn list_posts(&self, criteria: &FilterCriteria) -> Result<Vec<PostSummary>, StoreError> {
        let response = self
            .http
            .get(self.url("/blog"))
            .query(criteria)
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, StoreError> {
        let response = self.http.get(self.url("/blog/filters")).send().await?;
        Self::read(response).await
    }

    pub async fn get_post(&self, id: Uuid) -> Result<BlogPost, StoreError> {
        let response = self
            .http
            .get(self.url(&format!("/blog/{id}")))
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn get_contacts(&self) -> Result<Contacts, StoreError> {
        let response = self.http.get(self.url("/contacts")).send().await?;
        Self::read(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(AuthError::InvalidCredentials)
            }
            status => Err(AuthError::Unavailable(format!("login responded {status}"))),
        }
    }

    pub async fn me(&self, session: &Session) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(self.url("/me"))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(AuthError::ExpiredToken),
            status => Err(AuthError::Unavailable(format!("me responded {status}"))),
        }
    }

    /// dashboard
    ///
    /// `Ok(None)` when the server sends the caller back to `/admin` (no visible section).
    pub async fn dashboard(&self, session: &Session) -> Result<Option<Dashboard>, StoreError> {
        let response = self
            .http
            .get(self.url("/admin/dashboard"))
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if response.status().is_redirection() {
            return Ok(None);
        }
        Self::read(response).await.map(Some)
    }
}

#[async_trait]
impl PostSource for ApiClient {
    async fn fetch_posts(&self, request: &FetchRequest) -> Result<Vec<PostSummary>, StoreError> {
        self.list_posts(&request.criteria).await
    }

    async fn fetch_filter_options(&self) -> Result<FilterOptions, StoreError> {
        self.filter_options().await
    }
}

#[async_trait]
impl SessionProvider for ApiClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let login = self.login(email, password).await?;
        Ok(Session {
            user: login.user,
            access_token: login.access_token,
            refresh_token: login.refresh_token,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(AuthError::ExpiredToken),
            status => Err(AuthError::Unavailable(format!("logout responded {status}"))),
        }
    }
}
