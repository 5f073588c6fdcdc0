use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::BTreeMap;

use super::activity::{NewActivity, insert_activity};
use crate::entities::{permissions, prelude::*};

pub struct PermissionRepository {
    conn: DatabaseConnection,
}

impl PermissionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The explicit override for (user, tool), if one is stored.
    pub async fn explicit(&self, user_id: i32, tool_id: i32) -> Result<Option<bool>> {
        let row = Permissions::find()
            .filter(permissions::Column::UserId.eq(user_id))
            .filter(permissions::Column::ToolId.eq(tool_id))
            .one(&self.conn)
            .await
            .context("Failed to query permission")?;

        Ok(row.map(|p| p.can_access))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<permissions::Model>> {
        Permissions::find()
            .filter(permissions::Column::UserId.eq(user_id))
            .order_by_asc(permissions::Column::ToolId)
            .all(&self.conn)
            .await
            .context("Failed to list permissions")
    }

    /// Clears every row for `user_id`, inserts `access` and records `audit`,
    /// all or nothing.
    pub async fn replace_for_user(
        &self,
        user_id: i32,
        access: &BTreeMap<i32, bool>,
        audit: NewActivity,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        Permissions::delete_many()
            .filter(permissions::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to clear permissions")?;

        if !access.is_empty() {
            let rows: Vec<permissions::ActiveModel> = access
                .iter()
                .map(|(&tool_id, &can_access)| permissions::ActiveModel {
                    user_id: Set(user_id),
                    tool_id: Set(tool_id),
                    can_access: Set(can_access),
                    ..Default::default()
                })
                .collect();

            Permissions::insert_many(rows)
                .exec(&txn)
                .await
                .context("Failed to insert permissions")?;
        }

        insert_activity(&txn, &audit).await?;

        txn.commit().await?;
        Ok(())
    }
}
