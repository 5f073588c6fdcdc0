//! Credential lifecycle: hashing, verification, expiry, reuse prevention and
//! reset tokens.
//!
//! Policy enforcement is the caller's job for [`CredentialService::set_password`];
//! the redemption path enforces it itself.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use crate::clock::{Clock, parse_timestamp};
use crate::config::SecurityConfig;
use crate::db::repositories::user::{
    generate_token, hash_password_blocking, verify_password, verify_password_blocking,
};
use crate::db::{NewActivity, Store};
use crate::domain::policy::PasswordPolicy;
use crate::entities::users;
use crate::services::auth_service::{AuthError, RequestOrigin};

pub struct CredentialService {
    store: Store,
    clock: Arc<dyn Clock>,
    security: SecurityConfig,
}

impl CredentialService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>, security: SecurityConfig) -> Self {
        Self {
            store,
            clock,
            security,
        }
    }

    #[must_use]
    pub fn policy(&self) -> PasswordPolicy {
        PasswordPolicy::with_min_length(self.security.password_policy.min_length)
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        Ok(hash_password_blocking(plaintext, &self.security).await?)
    }

    /// Policy first, then reuse. Shared by every path that accepts a new
    /// password for an existing account.
    pub async fn vet_new_password(&self, user_id: i32, plaintext: &str) -> Result<(), AuthError> {
        if !self.policy().is_valid(plaintext) {
            return Err(AuthError::PolicyViolation);
        }

        if self.is_password_in_history(user_id, plaintext).await? {
            return Err(AuthError::PasswordReused);
        }

        Ok(())
    }

    /// Stores a new credential and appends it to the history.
    pub async fn set_password(&self, user_id: i32, plaintext: &str) -> Result<(), AuthError> {
        let password_hash = self.hash(plaintext).await?;

        let updated = self
            .store
            .credentials()
            .set_password(user_id, password_hash, self.clock.now())
            .await?;

        if !updated {
            return Err(AuthError::NotFound("User".to_string()));
        }

        debug!(user_id, "Password updated");
        Ok(())
    }

    pub async fn check_password(
        &self,
        user: &users::Model,
        plaintext: &str,
    ) -> Result<bool, AuthError> {
        match verify_password_blocking(&user.password_hash, plaintext).await {
            Ok(matches) => Ok(matches),
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Stored password hash is unreadable");
                Ok(false)
            }
        }
    }

    /// True once more than `expiry_days` have passed since the last change.
    pub fn is_password_expired(&self, user: &users::Model) -> Result<bool, AuthError> {
        let changed_at = parse_timestamp(&user.last_password_change)?;
        let window = Duration::try_days(self.security.password_policy.expiry_days)
            .ok_or_else(|| AuthError::Internal("Password expiry window out of range".to_string()))?;
        Ok(self.clock.now().signed_duration_since(changed_at) > window)
    }

    /// Compares against the newest `history_depth` entries. The current
    /// password is always among them.
    pub async fn is_password_in_history(
        &self,
        user_id: i32,
        plaintext: &str,
    ) -> Result<bool, AuthError> {
        let hashes = self
            .store
            .credentials()
            .recent_history(user_id, self.security.password_policy.history_depth)
            .await?;

        let plaintext = plaintext.to_string();
        let reused = tokio::task::spawn_blocking(move || {
            hashes
                .iter()
                .any(|hash| verify_password(hash, &plaintext).unwrap_or(false))
        })
        .await
        .map_err(|e| AuthError::Internal(format!("History check task panicked: {e}")))?;

        Ok(reused)
    }

    pub async fn issue_reset_token(&self, user_id: i32) -> Result<String, AuthError> {
        let token = generate_token();
        let now = self.clock.now();
        let expires_at = Duration::try_hours(self.security.password_policy.reset_token_ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AuthError::Internal("Reset token TTL out of range".to_string()))?;

        self.store
            .reset_tokens()
            .insert(user_id, &token, expires_at, now)
            .await?;

        debug!(user_id, %expires_at, "Reset token issued");
        Ok(token)
    }

    pub async fn is_token_valid(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self
            .store
            .reset_tokens()
            .find_valid(token, self.clock.now())
            .await?
            .is_some())
    }

    /// Validates the token, vets the password and installs it. The token is
    /// only consumed when every check passes.
    pub async fn redeem_reset_token(
        &self,
        token: &str,
        new_plaintext: &str,
        origin: &RequestOrigin,
    ) -> Result<i32, AuthError> {
        let now = self.clock.now();

        let record = self
            .store
            .reset_tokens()
            .find_valid(token, now)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        self.vet_new_password(record.user_id, new_plaintext).await?;

        let password_hash = self.hash(new_plaintext).await?;
        let audit = NewActivity::new(record.user_id, "password_reset", now)
            .details("Password reset via token")
            .origin(origin.ip_address.clone());

        let redeemed = self
            .store
            .reset_tokens()
            .redeem(record.id, record.user_id, password_hash, now, audit)
            .await?;

        if !redeemed {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        Ok(record.user_id)
    }

    pub async fn purge_stale_tokens(&self) -> Result<u64, AuthError> {
        Ok(self.store.reset_tokens().purge_stale(self.clock.now()).await?)
    }
}
