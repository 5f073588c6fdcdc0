use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
};

use super::activity::{NewActivity, insert_activity};
use super::user::append_history;
use crate::clock::format_timestamp;
use crate::entities::{password_reset_tokens, prelude::*, users};

pub struct ResetTokenRepository {
    conn: DatabaseConnection,
}

impl ResetTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        PasswordResetTokens::insert(password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.to_string()),
            expires_at: Set(format_timestamp(expires_at)),
            used: Set(false),
            created_at: Set(format_timestamp(now)),
            ..Default::default()
        })
        .exec(&self.conn)
        .await
        .context("Failed to store reset token")?;

        Ok(())
    }

    /// Returns the token only while it is unused and `now <= expires_at`.
    pub async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<password_reset_tokens::Model>> {
        PasswordResetTokens::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .filter(password_reset_tokens::Column::ExpiresAt.gte(format_timestamp(now)))
            .one(&self.conn)
            .await
            .context("Failed to query reset token")
    }

    /// Consumes the token and installs the new credential atomically.
    ///
    /// The `used = false` guard on the update makes the unused→used flip
    /// happen at most once; a concurrent redemption that loses the race sees
    /// zero affected rows and gets `false` with nothing written.
    pub async fn redeem(
        &self,
        token_id: i32,
        user_id: i32,
        password_hash: String,
        now: DateTime<Utc>,
        audit: NewActivity,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;
        let stamp = format_timestamp(now);

        let consumed = PasswordResetTokens::update_many()
            .col_expr(
                password_reset_tokens::Column::Used,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(password_reset_tokens::Column::Id.eq(token_id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .filter(password_reset_tokens::Column::ExpiresAt.gte(stamp.clone()))
            .exec(&txn)
            .await
            .context("Failed to mark reset token used")?;

        if consumed.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(false);
        }

        Users::update_many()
            .col_expr(
                users::Column::PasswordHash,
                sea_orm::sea_query::Expr::value(password_hash.clone()),
            )
            .col_expr(
                users::Column::LastPasswordChange,
                sea_orm::sea_query::Expr::value(stamp.clone()),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to update password hash")?;

        append_history(&txn, user_id, password_hash, stamp).await?;
        insert_activity(&txn, &audit).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Deletes tokens that are used or already past expiry.
    pub async fn purge_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = PasswordResetTokens::delete_many()
            .filter(
                Condition::any()
                    .add(password_reset_tokens::Column::Used.eq(true))
                    .add(password_reset_tokens::Column::ExpiresAt.lt(format_timestamp(now))),
            )
            .exec(&self.conn)
            .await
            .context("Failed to purge reset tokens")?;

        Ok(result.rows_affected)
    }
}
