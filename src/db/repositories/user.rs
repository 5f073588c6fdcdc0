use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tokio::task;

use super::activity::{NewActivity, insert_activity};
use crate::clock::format_timestamp;
use crate::config::SecurityConfig;
use crate::domain::Role;
use crate::entities::{
    activity_logs, password_history, password_reset_tokens, permissions, prelude::*, users,
};

/// Fields for a brand-new account. The password arrives separately, already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

/// Editable profile fields.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Deleted,
    /// The account still owns audit entries, so it was disabled instead.
    Deactivated,
}

/// Which unique field collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityConflict {
    Username,
    Email,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")
    }

    /// Username match first, email second.
    pub async fn get_by_login(&self, login: &str) -> Result<Option<users::Model>> {
        if let Some(user) = self.get_by_username(login).await? {
            return Ok(Some(user));
        }

        self.get_by_email(login).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    pub async fn list_all(&self) -> Result<Vec<users::Model>> {
        Users::find()
            .order_by_asc(users::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to list users")
    }

    pub async fn count(&self) -> Result<u64> {
        let count = Users::find().count(&self.conn).await?;
        Ok(count)
    }

    /// Looks for another account already holding `username` or `email`.
    /// Both values are login identifiers, so each is checked against both
    /// columns.
    pub async fn find_conflict(
        &self,
        username: &str,
        email: &str,
        excluding: Option<i32>,
    ) -> Result<Option<IdentityConflict>> {
        if self.identifier_taken(username, excluding).await? {
            return Ok(Some(IdentityConflict::Username));
        }

        if self.identifier_taken(email, excluding).await? {
            return Ok(Some(IdentityConflict::Email));
        }

        Ok(None)
    }

    async fn identifier_taken(&self, value: &str, excluding: Option<i32>) -> Result<bool> {
        let mut condition = Condition::all().add(
            Condition::any()
                .add(users::Column::Username.eq(value))
                .add(users::Column::Email.eq(value)),
        );
        if let Some(id) = excluding {
            condition = condition.add(users::Column::Id.ne(id));
        }

        let holders = Users::find()
            .filter(condition)
            .count(&self.conn)
            .await
            .context("Failed to check login identifier")?;
        Ok(holders > 0)
    }

    /// Inserts the account together with its first history entry.
    pub async fn create(
        &self,
        user: NewUser,
        password_hash: String,
        now: DateTime<Utc>,
        audit: Option<NewActivity>,
    ) -> Result<users::Model> {
        let txn = self.conn.begin().await?;
        let stamp = format_timestamp(now);

        let created = users::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(password_hash.clone()),
            full_name: Set(user.full_name),
            phone_number: Set(user.phone_number),
            department: Set(user.department),
            role: Set(user.role.as_str().to_string()),
            is_active: Set(user.is_active),
            last_password_change: Set(stamp.clone()),
            created_at: Set(stamp.clone()),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert user")?;

        append_history(&txn, created.id, password_hash, stamp).await?;

        if let Some(audit) = audit {
            insert_activity(&txn, &audit).await?;
        }

        txn.commit().await?;
        Ok(created)
    }

    pub async fn update_profile(
        &self,
        id: i32,
        update: UserUpdate,
        audit: NewActivity,
    ) -> Result<users::Model> {
        let txn = self.conn.begin().await?;

        let existing = Users::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = existing.into();
        active.username = Set(update.username);
        active.email = Set(update.email);
        active.full_name = Set(update.full_name);
        active.phone_number = Set(update.phone_number);
        active.department = Set(update.department);
        active.role = Set(update.role.as_str().to_string());
        active.is_active = Set(update.is_active);
        let updated = active.update(&txn).await.context("Failed to update user")?;

        insert_activity(&txn, &audit).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Stamps `last_login` and writes the `login` audit entry atomically.
    pub async fn record_login(&self, id: i32, audit: NewActivity) -> Result<()> {
        let txn = self.conn.begin().await?;

        Users::update_many()
            .col_expr(
                users::Column::LastLogin,
                sea_orm::sea_query::Expr::value(format_timestamp(audit.at)),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&txn)
            .await
            .context("Failed to update last login")?;

        insert_activity(&txn, &audit).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Deletes the account, or disables it and revokes its permissions when
    /// audit entries still reference it. The admin's audit entry is written
    /// first inside the same transaction.
    pub async fn remove(&self, id: i32, audit: NewActivity) -> Result<RemovalOutcome> {
        let txn = self.conn.begin().await?;

        insert_activity(&txn, &audit).await?;

        let referenced = ActivityLogs::find()
            .filter(activity_logs::Column::UserId.eq(id))
            .count(&txn)
            .await?
            > 0;

        let outcome = if referenced {
            Users::update_many()
                .col_expr(
                    users::Column::IsActive,
                    sea_orm::sea_query::Expr::value(false),
                )
                .filter(users::Column::Id.eq(id))
                .exec(&txn)
                .await?;

            Permissions::delete_many()
                .filter(permissions::Column::UserId.eq(id))
                .exec(&txn)
                .await?;

            PasswordResetTokens::delete_many()
                .filter(password_reset_tokens::Column::UserId.eq(id))
                .exec(&txn)
                .await?;

            RemovalOutcome::Deactivated
        } else {
            Users::delete_by_id(id)
                .exec(&txn)
                .await
                .context("Failed to delete user")?;

            RemovalOutcome::Deleted
        };

        txn.commit().await?;
        Ok(outcome)
    }
}

pub(super) async fn append_history<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    password_hash: String,
    stamp: String,
) -> Result<()> {
    PasswordHistory::insert(password_history::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(password_hash),
        created_at: Set(stamp),
        ..Default::default()
    })
    .exec(conn)
    .await
    .context("Failed to append password history")?;

    Ok(())
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC string. The cost parameters are
/// read from the hash itself.
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Runs [`hash_password`] off the async runtime; Argon2 is CPU-bound.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .context("Password hashing task panicked")?
}

/// Runs [`verify_password`] off the async runtime.
pub async fn verify_password_blocking(password_hash: &str, password: &str) -> Result<bool> {
    let password_hash = password_hash.to_string();
    let password = password.to_string();
    task::spawn_blocking(move || verify_password(&password_hash, &password))
        .await
        .context("Password verification task panicked")?
}

/// Generate a random token (64 character hex string, 256 bits).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Xx1!aaaaaa", &cheap_config()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "Xx1!aaaaaa").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let config = cheap_config();
        let a = hash_password("Password123!", &config).unwrap();
        let b = hash_password("Password123!", &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "anything").is_err());
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }
}
