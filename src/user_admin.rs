use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    access::Role,
    error::{StoreError, ValidationError},
    models::ManagedUser,
};

/// UserAction
///
/// Request body of the `user-management` edge function:
/// `{ "action": "<kebab-case>", "payload": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "kebab-case")]
pub enum UserAction {
    ListUsers,
    Invite {
        email: String,
        role: Role,
        #[serde(rename = "redirectTo")]
        redirect_to: String,
    },
    UpdateRole {
        #[serde(rename = "userId")]
        user_id: Uuid,
        role: Role,
    },
    DeleteUser {
        #[serde(rename = "userId")]
        user_id: Uuid,
    },
}

impl UserAction {
    /// Builds a delete action, refusing to let an administrator remove their own account.
    pub fn delete_user(caller: Uuid, target: Uuid) -> Result<Self, ValidationError> {
        if caller == target {
            return Err(ValidationError::invalid(
                "user_id",
                "you cannot delete your own account",
            ));
        }
        Ok(UserAction::DeleteUser { user_id: target })
    }

    pub fn name(&self) -> &'static str {
        match self {
            UserAction::ListUsers => "list-users",
            UserAction::Invite { .. } => "invite",
            UserAction::UpdateRole { .. } => "update-role",
            UserAction::DeleteUser { .. } => "delete-user",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserActionOutcome {
    Users(Vec<ManagedUser>),
    Done,
}

/// UserManagement
///
/// The privileged user-management collaborator. Only reachable from the users
/// section, which is admin-only.
#[async_trait]
pub trait UserManagement: Send + Sync {
    async fn invoke(&self, action: UserAction) -> Result<UserActionOutcome, StoreError>;
}

pub type UserManagementState = Arc<dyn UserManagement>;

// --- Supabase Edge Function ---

/// SupabaseUserFunction
///
/// Calls `{SUPABASE_URL}/functions/v1/user-management` with the service-role key.
#[derive(Clone)]
pub struct SupabaseUserFunction {
    http: reqwest::Client,
    url: String,
    service_key: String,
}

impl SupabaseUserFunction {
    pub fn new(supabase_url: &str, service_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!(
                "{}/functions/v1/user-management",
                supabase_url.trim_end_matches('/')
            ),
            service_key: service_key.to_string(),
        }
    }
}

// Roles arrive as free text; anything unrecognised is shown as "no role".
#[derive(Deserialize)]
struct WireUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_sign_in_at: Option<String>,
}

impl From<WireUser> for ManagedUser {
    fn from(user: WireUser) -> Self {
        ManagedUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            role: user.role.and_then(|r| r.parse().ok()),
            created_at: user.created_at,
            last_sign_in_at: user.last_sign_in_at,
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    users: Option<Vec<WireUser>>,
}

#[async_trait]
impl UserManagement for SupabaseUserFunction {
    async fn invoke(&self, action: UserAction) -> Result<UserActionOutcome, StoreError> {
        let name = action.name();
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&action)
            .send()
            .await?;

        let status = response.status();
        let body: WireResponse = response.json().await.map_err(|e| {
            tracing::error!(action = name, %status, "unreadable user-management response: {}", e);
            StoreError::Backend(format!("user-management responded {status}"))
        })?;

        if let Some(message) = body.error {
            tracing::warn!(action = name, %status, "user-management error: {}", message);
            return Err(StoreError::Backend(message));
        }
        if !status.is_success() {
            return Err(StoreError::Backend(format!("user-management responded {status}")));
        }

        Ok(match action {
            UserAction::ListUsers => UserActionOutcome::Users(
                body.users
                    .unwrap_or_default()
                    .into_iter()
                    .map(ManagedUser::from)
                    .collect(),
            ),
            _ => UserActionOutcome::Done,
        })
    }
}

// --- In-memory implementation ---

/// MockUserManagement
///
/// Keeps a user list in memory and records every action it receives.
#[derive(Clone, Default)]
pub struct MockUserManagement {
    users: Arc<Mutex<Vec<ManagedUser>>>,
    calls: Arc<Mutex<Vec<UserAction>>>,
    /// When true, every call fails with a simulated backend error.
    pub should_fail: bool,
}

impl MockUserManagement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub async fn with_user(self, user: ManagedUser) -> Self {
        self.users.lock().await.push(user);
        self
    }

    pub async fn calls(&self) -> Vec<UserAction> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl UserManagement for MockUserManagement {
    async fn invoke(&self, action: UserAction) -> Result<UserActionOutcome, StoreError> {
        self.calls.lock().await.push(action.clone());
        if self.should_fail {
            return Err(StoreError::Backend("Mock user-management failure".to_string()));
        }

        let mut users = self.users.lock().await;
        match action {
            UserAction::ListUsers => Ok(UserActionOutcome::Users(users.clone())),
            UserAction::Invite { email, role, .. } => {
                if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
                    return Err(StoreError::Constraint(format!("{email} is already registered")));
                }
                users.push(ManagedUser {
                    id: Uuid::new_v4(),
                    email,
                    role: Some(role),
                    created_at: None,
                    last_sign_in_at: None,
                });
                Ok(UserActionOutcome::Done)
            }
            UserAction::UpdateRole { user_id, role } => {
                let user = users
                    .iter_mut()
                    .find(|u| u.id == user_id)
                    .ok_or(StoreError::NotFound)?;
                user.role = Some(role);
                Ok(UserActionOutcome::Done)
            }
            UserAction::DeleteUser { user_id } => {
                let before = users.len();
                users.retain(|u| u.id != user_id);
                if users.len() == before {
                    Err(StoreError::NotFound)
                } else {
                    Ok(UserActionOutcome::Done)
                }
            }
        }
    }
}
