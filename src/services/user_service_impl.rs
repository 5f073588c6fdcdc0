//! `SeaORM` implementation of the `UserAdminService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};
use tracing::info;

use crate::db::{IdentityConflict, NewActivity, NewUser, RemovalOutcome, Store, UserUpdate};
use crate::domain::{AuthenticatedIdentity, Role};
use crate::entities::users;
use crate::services::audit::AuditService;
use crate::services::auth_service::{AuthError, RequestOrigin};
use crate::services::credentials::CredentialService;
use crate::services::user_service::{
    CreateUserRequest, UpdateUserRequest, UserAdminService, UserSummary,
};

pub struct SeaOrmUserAdminService {
    store: Store,
    credentials: Arc<CredentialService>,
    audit: Arc<AuditService>,
}

impl SeaOrmUserAdminService {
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

    /// Creates an account after the uniqueness and policy checks. Used by the
    /// admin endpoint, the CLI and bootstrap; `actor` is `None` for the
    /// latter two, in which case nothing is audited.
    pub async fn provision(
        &self,
        user: NewUser,
        password: &str,
        actor: Option<(&AuthenticatedIdentity, &RequestOrigin)>,
    ) -> Result<users::Model, AuthError> {
        self.ensure_unique(&user.username, &user.email, None).await?;

        if !self.credentials.policy().is_valid(password) {
            return Err(AuthError::PolicyViolation);
        }

        let password_hash = self.credentials.hash(password).await?;
        let now = self.credentials.clock().now();
        let audit = actor.map(|(admin, origin)| {
            NewActivity::new(admin.user_id, "user_created", now)
                .details(format!("Created user: {}", user.username))
                .origin(origin.ip_address.clone())
        });

        let created = self
            .store
            .users()
            .create(user, password_hash, now, audit)
            .await
            .map_err(identity_write_error)?;

        info!(
            user_id = created.id,
            username = %created.username,
            role = %created.role,
            "User created"
        );
        Ok(created)
    }

    async fn ensure_unique(
        &self,
        username: &str,
        email: &str,
        excluding: Option<i32>,
    ) -> Result<(), AuthError> {
        match self
            .store
            .users()
            .find_conflict(username, email, excluding)
            .await?
        {
            Some(IdentityConflict::Username) => {
                Err(AuthError::DuplicateIdentity("Username".to_string()))
            }
            Some(IdentityConflict::Email) => Err(AuthError::DuplicateIdentity("Email".to_string())),
            None => Ok(()),
        }
    }

    async fn load(&self, user_id: i32) -> Result<users::Model, AuthError> {
        self.store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))
    }
}

/// A concurrent writer can claim an identifier between the uniqueness
/// check and the write; the unique index then reports the collision.
fn identity_write_error(err: anyhow::Error) -> AuthError {
    match err.downcast_ref::<DbErr>().and_then(DbErr::sql_err) {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            let field = if detail.contains("email") {
                "Email"
            } else {
                "Username"
            };
            AuthError::DuplicateIdentity(field.to_string())
        }
        _ => err.into(),
    }
}

fn require_admin(identity: &AuthenticatedIdentity) -> Result<(), AuthError> {
    if matches!(identity.role, Role::Admin) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}

fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| required(&v))
}

fn parse_requested_role(raw: &str) -> Result<Role, AuthError> {
    raw.parse()
        .map_err(|e: crate::domain::UnknownRole| AuthError::Validation(e.to_string()))
}

#[async_trait]
impl UserAdminService for SeaOrmUserAdminService {
    async fn list_users(
        &self,
        admin: &AuthenticatedIdentity,
    ) -> Result<Vec<UserSummary>, AuthError> {
        require_admin(admin)?;
        let users = self.store.users().list_all().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    async fn get_user(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
    ) -> Result<UserSummary, AuthError> {
        require_admin(admin)?;
        Ok(self.load(user_id).await?.into())
    }

    async fn create_user(
        &self,
        admin: &AuthenticatedIdentity,
        request: CreateUserRequest,
        origin: &RequestOrigin,
    ) -> Result<UserSummary, AuthError> {
        require_admin(admin)?;

        let (Some(username), Some(email), Some(full_name), Some(role)) = (
            required(&request.username),
            required(&request.email),
            required(&request.full_name),
            required(&request.role),
        ) else {
            return Err(AuthError::Validation(
                "All required fields must be filled".to_string(),
            ));
        };
        if request.password.is_empty() {
            return Err(AuthError::Validation(
                "All required fields must be filled".to_string(),
            ));
        }

        let user = NewUser {
            username,
            email,
            full_name,
            phone_number: optional(request.phone_number),
            department: optional(request.department),
            role: parse_requested_role(&role)?,
            is_active: request.is_active.unwrap_or(true),
        };

        let created = self
            .provision(user, &request.password, Some((admin, origin)))
            .await?;
        Ok(created.into())
    }

    async fn update_user(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
        request: UpdateUserRequest,
        origin: &RequestOrigin,
    ) -> Result<UserSummary, AuthError> {
        require_admin(admin)?;

        if user_id == admin.user_id {
            return Err(AuthError::Validation(
                "You cannot edit your own account here".to_string(),
            ));
        }

        self.load(user_id).await?;

        let (Some(username), Some(email), Some(full_name)) = (
            required(&request.username),
            required(&request.email),
            required(&request.full_name),
        ) else {
            return Err(AuthError::Validation(
                "All required fields must be filled".to_string(),
            ));
        };

        self.ensure_unique(&username, &email, Some(user_id)).await?;

        let update = UserUpdate {
            username,
            email,
            full_name,
            phone_number: optional(request.phone_number),
            department: optional(request.department),
            role: parse_requested_role(&request.role)?,
            is_active: request.is_active,
        };

        let audit = NewActivity::new(admin.user_id, "user_updated", self.credentials.clock().now())
            .details(format!("Updated user: {}", update.username))
            .origin(origin.ip_address.clone());

        let updated = self
            .store
            .users()
            .update_profile(user_id, update, audit)
            .await
            .map_err(identity_write_error)?;

        info!(user_id, admin = %admin.username, "User updated");
        Ok(updated.into())
    }

    async fn reset_user_password(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
        password: &str,
        confirm_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError> {
        require_admin(admin)?;
        let target = self.load(user_id).await?;

        if password != confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_string()));
        }

        self.credentials.vet_new_password(target.id, password).await?;
        self.credentials.set_password(target.id, password).await?;

        self.audit
            .log(
                admin.user_id,
                "password_reset_by_admin",
                Some(format!("Reset password for user: {}", target.username)),
                Some(origin),
            )
            .await;

        info!(user_id, admin = %admin.username, "Password reset by admin");
        Ok(())
    }

    async fn delete_user(
        &self,
        admin: &AuthenticatedIdentity,
        user_id: i32,
        origin: &RequestOrigin,
    ) -> Result<RemovalOutcome, AuthError> {
        require_admin(admin)?;

        if user_id == admin.user_id {
            return Err(AuthError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        let target = self.load(user_id).await?;

        let audit = NewActivity::new(admin.user_id, "user_deleted", self.credentials.clock().now())
            .details(format!("Deleted user: {}", target.username))
            .origin(origin.ip_address.clone());

        let outcome = self.store.users().remove(user_id, audit).await?;

        info!(user_id, admin = %admin.username, ?outcome, "User removed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use chrono::Utc;

    fn account(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Test Account".to_string(),
            phone_number: None,
            department: None,
            role: Role::Staff,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn unique_index_collisions_become_duplicate_identity() {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        let hash = crate::db::repositories::user::hash_password("Password123!", &security)
            .unwrap();
        let users = store.users();

        users
            .create(account("kim", "kim@example.com"), hash.clone(), Utc::now(), None)
            .await
            .unwrap();

        // Straight to the write, as a racing request would be.
        let err = users
            .create(account("kim", "other@example.com"), hash.clone(), Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            identity_write_error(err),
            AuthError::DuplicateIdentity(field) if field == "Username"
        ));

        let err = users
            .create(account("lee", "kim@example.com"), hash, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            identity_write_error(err),
            AuthError::DuplicateIdentity(field) if field == "Email"
        ));
    }

    #[test]
    fn other_failures_stay_internal() {
        let err = anyhow::anyhow!("disk on fire");
        assert!(matches!(identity_write_error(err), AuthError::Internal(_)));
    }
}
