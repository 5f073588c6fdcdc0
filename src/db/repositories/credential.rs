use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};

use super::user::append_history;
use crate::clock::format_timestamp;
use crate::entities::{password_history, prelude::*, users};

pub struct CredentialRepository {
    conn: DatabaseConnection,
}

impl CredentialRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Replaces the stored hash, stamps the change time and appends a history
    /// row, all in one transaction.
    ///
    /// Returns `false` when the user does not exist.
    pub async fn set_password(
        &self,
        user_id: i32,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;
        let stamp = format_timestamp(now);

        let updated = Users::update_many()
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

        if updated.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        append_history(&txn, user_id, password_hash, stamp).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// The `depth` newest history hashes, newest first.
    pub async fn recent_history(&self, user_id: i32, depth: u64) -> Result<Vec<String>> {
        let hashes: Vec<String> = PasswordHistory::find()
            .select_only()
            .column(password_history::Column::PasswordHash)
            .filter(password_history::Column::UserId.eq(user_id))
            .order_by_desc(password_history::Column::CreatedAt)
            .order_by_desc(password_history::Column::Id)
            .limit(depth)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to load password history")?;

        Ok(hashes)
    }
}
