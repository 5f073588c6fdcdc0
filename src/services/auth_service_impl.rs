//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::{NewActivity, Store};
use crate::domain::AuthenticatedIdentity;
use crate::services::access::parse_role;
use crate::services::audit::AuditService;
use crate::services::auth_service::{
    AuthError, AuthService, CurrentUser, LoginOutcome, RequestOrigin,
};
use crate::services::credentials::CredentialService;

pub struct SeaOrmAuthService {
    store: Store,
    credentials: Arc<CredentialService>,
    audit: Arc<AuditService>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        credentials: Arc<CredentialService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            store,
            credentials,
            audit,
        }
    }
}

fn count_login(outcome: &'static str) {
    metrics::counter!("auth_login_total", "outcome" => outcome).increment(1);
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(
        &self,
        login: &str,
        password: &str,
        origin: &RequestOrigin,
    ) -> Result<LoginOutcome, AuthError> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        // Unknown login and wrong password must be indistinguishable
        let Some(user) = self.store.users().get_by_login(login).await? else {
            count_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.check_password(&user, password).await? {
            count_login("invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            count_login("account_disabled");
            warn!(user_id = user.id, "Login attempt on disabled account");
            return Err(AuthError::AccountDisabled);
        }

        if self.credentials.is_password_expired(&user)? {
            let reset_token = self.credentials.issue_reset_token(user.id).await?;
            count_login("password_expired");
            info!(user_id = user.id, "Password expired, reset required");
            return Ok(LoginOutcome::PasswordExpired {
                user_id: user.id,
                reset_token,
            });
        }

        let role = parse_role(&user.role)?;
        let audit = NewActivity::new(user.id, "login", self.credentials.clock().now())
            .details(format!("User logged in: {}", user.username))
            .origin(origin.ip_address.clone());

        self.store.users().record_login(user.id, audit).await?;

        count_login("success");
        info!(user_id = user.id, username = %user.username, "User logged in");

        Ok(LoginOutcome::Authenticated(AuthenticatedIdentity::new(
            user.id,
            user.username,
            role,
        )))
    }

    async fn logout(
        &self,
        identity: &AuthenticatedIdentity,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError> {
        let entry = NewActivity::new(identity.user_id, "logout", self.credentials.clock().now())
            .details(format!("User logged out: {}", identity.username))
            .origin(origin.ip_address.clone());

        // Must land before the session is torn down
        self.store.activity().append(&entry).await?;

        info!(user_id = identity.user_id, "User logged out");
        Ok(())
    }

    async fn resolve_identity(
        &self,
        user_id: i32,
    ) -> Result<Option<AuthenticatedIdentity>, AuthError> {
        let Some(user) = self.store.users().get_by_id(user_id).await? else {
            return Ok(None);
        };

        if !user.is_active {
            return Ok(None);
        }

        let role = parse_role(&user.role)?;
        Ok(Some(AuthenticatedIdentity::new(user.id, user.username, role)))
    }

    async fn current_user(
        &self,
        identity: &AuthenticatedIdentity,
    ) -> Result<CurrentUser, AuthError> {
        let user = self
            .store
            .users()
            .get_by_id(identity.user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))?;

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            last_login: user.last_login,
            last_password_change: user.last_password_change,
        })
    }

    async fn change_password(
        &self,
        identity: &AuthenticatedIdentity,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .users()
            .get_by_id(identity.user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))?;

        if !self.credentials.check_password(&user, current_password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if new_password != confirm_password {
            return Err(AuthError::Validation("New passwords do not match".to_string()));
        }

        self.credentials.vet_new_password(user.id, new_password).await?;
        self.credentials.set_password(user.id, new_password).await?;

        self.audit
            .log(
                user.id,
                "password_change",
                Some(format!("Password changed for user: {}", user.username)),
                Some(origin),
            )
            .await;

        info!(user_id = user.id, "Password changed");
        Ok(())
    }

    async fn request_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }

        let Some(user) = self.store.users().get_by_email(email).await? else {
            return Ok(None);
        };

        let token = self.credentials.issue_reset_token(user.id).await?;
        info!(user_id = user.id, "Password reset requested");
        Ok(Some(token))
    }

    async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError> {
        if !self.credentials.is_token_valid(token).await? {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        if password != confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_string()));
        }

        let user_id = self
            .credentials
            .redeem_reset_token(token, password, origin)
            .await?;

        info!(user_id, "Password reset via token");
        Ok(())
    }
}
