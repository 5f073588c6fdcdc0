//! Domain service for the session/auth gateway.
//!
//! Handles login, logout, self-service password changes and the
//! password-reset token flow. Session storage itself belongs to the HTTP
//! layer; this service only decides who may have one.

use serde::Serialize;
use thiserror::Error;

use crate::domain::AuthenticatedIdentity;

/// Every failure the account and access core can report.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("This account has been disabled")]
    AccountDisabled,

    #[error("{}", crate::domain::policy::POLICY_DESCRIPTION)]
    PolicyViolation,

    #[error("Cannot reuse any of your last passwords")]
    PasswordReused,

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("{0} already exists")]
    DuplicateIdentity(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Result of a credential check that passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// The caller may be given a session.
    Authenticated(AuthenticatedIdentity),

    /// Credentials were right but the password is past its rotation window.
    /// No session is granted; the token must be redeemed first.
    PasswordExpired { user_id: i32, reset_token: String },
}

/// Where a request came from, for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
}

impl RequestOrigin {
    #[must_use]
    pub fn ip(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
        }
    }
}

/// Profile of the signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub last_login: Option<String>,
    pub last_password_change: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks `login` (username or email) and `password`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown login or a wrong
    /// password (same message for both) and [`AuthError::AccountDisabled`] for
    /// inactive accounts.
    async fn login(
        &self,
        login: &str,
        password: &str,
        origin: &RequestOrigin,
    ) -> Result<LoginOutcome, AuthError>;

    /// Audits the logout. The caller tears the session down afterwards.
    async fn logout(
        &self,
        identity: &AuthenticatedIdentity,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError>;

    /// Resolves a session's user id into an identity, or `None` when the
    /// account vanished or was disabled.
    async fn resolve_identity(
        &self,
        user_id: i32,
    ) -> Result<Option<AuthenticatedIdentity>, AuthError>;

    async fn current_user(&self, identity: &AuthenticatedIdentity)
    -> Result<CurrentUser, AuthError>;

    /// Self-service password change.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] if `current_password` is wrong,
    /// [`AuthError::Validation`] when the confirmation differs,
    /// [`AuthError::PolicyViolation`] or [`AuthError::PasswordReused`] for a
    /// rejected new password.
    async fn change_password(
        &self,
        identity: &AuthenticatedIdentity,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError>;

    /// Issues a reset token when `email` belongs to an account. Returns the
    /// token so the caller can deliver it; `None` for unknown addresses.
    async fn request_reset(&self, email: &str) -> Result<Option<String>, AuthError>;

    /// Redeems a reset token with a new password.
    async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError>;
}
