//! Domain service for account administration (Admin only).

use serde::{Deserialize, Serialize};

use crate::db::RemovalOutcome;
use crate::domain::AuthenticatedIdentity;
use crate::entities::users;
use crate::services::auth_service::{AuthError, RequestOrigin};

/// Account view without the credential.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
    pub last_password_change: String,
}

impl From<users::Model> for UserSummary {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            phone_number: model.phone_number,
            department: model.department,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at,
            last_login: model.last_login,
            last_password_change: model.last_password_change,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub is_active: bool,
}

#[async_trait::async_trait]
pub trait UserAdminService: Send + Sync {
    async fn list_users(&self, admin: &AuthenticatedIdentity)
    -> Result<Vec<UserSummary>, AuthError>;

    async fn get_user(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
    ) -> Result<UserSummary, AuthError>;

    /// # Errors
    ///
    /// [`AuthError::Validation`] for missing fields or an unknown role,
    /// [`AuthError::DuplicateIdentity`] for a taken username or email,
    /// [`AuthError::PolicyViolation`] for a weak password.
    async fn create_user(
        &self,
        admin: &AuthenticatedIdentity,
        request: CreateUserRequest,
        origin: &RequestOrigin,
    ) -> Result<UserSummary, AuthError>;

    /// Admins cannot edit their own account through this path.
    async fn update_user(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
        request: UpdateUserRequest,
        origin: &RequestOrigin,
    ) -> Result<UserSummary, AuthError>;

    async fn reset_user_password(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
        password: &str,
        confirm_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError>;

    /// Admins cannot delete themselves.
    async fn delete_user(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
        origin: &RequestOrigin,
    ) -> Result<RemovalOutcome, AuthError>;
}
