use crate::clock::{format_timestamp, start_of_day};
use crate::domain::access::AuditScope;
use crate::entities::{activity_logs, prelude::*, users};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Serialize;

/// An audit entry waiting to be written.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: i32,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub at: DateTime<Utc>,
}

impl NewActivity {
    pub fn new(user_id: i32, action: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            action: action.into(),
            details: None,
            ip_address: None,
            at,
        }
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn origin(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

/// Activity entry joined with the actor's username and role.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRow {
    pub id: i64,
    pub user_id: i32,
    pub username: Option<String>,
    pub user_role: Option<String>,
    pub action: String,
    pub timestamp: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl From<(activity_logs::Model, Option<users::Model>)> for ActivityRow {
    fn from((entry, actor): (activity_logs::Model, Option<users::Model>)) -> Self {
        let (username, user_role) = actor.map_or((None, None), |u| (Some(u.username), Some(u.role)));
        Self {
            id: entry.id,
            user_id: entry.user_id,
            username,
            user_role,
            action: entry.action,
            timestamp: entry.timestamp,
            details: entry.details,
            ip_address: entry.ip_address,
        }
    }
}

/// Conjunctive filter; every `Some` field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: Option<i32>,
    pub action: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// Inclusive: the whole of this day is covered.
    pub end_date: Option<NaiveDate>,
}

/// Writes one entry on any connection, so callers can bundle it into a transaction.
pub async fn insert_activity<C: ConnectionTrait>(conn: &C, entry: &NewActivity) -> Result<()> {
    let active_model = activity_logs::ActiveModel {
        user_id: Set(entry.user_id),
        action: Set(entry.action.clone()),
        timestamp: Set(format_timestamp(entry.at)),
        details: Set(entry.details.clone()),
        ip_address: Set(entry.ip_address.clone()),
        ..Default::default()
    };

    ActivityLogs::insert(active_model)
        .exec(conn)
        .await
        .with_context(|| format!("Failed to record '{}' activity", entry.action))?;

    Ok(())
}

fn scope_condition(scope: AuditScope) -> Condition {
    match scope {
        AuditScope::All => Condition::all(),
        AuditScope::StaffAndSelf(viewer) => Condition::any()
            .add(users::Column::Role.eq(crate::domain::Role::Staff.as_str()))
            .add(activity_logs::Column::UserId.eq(viewer)),
        AuditScope::OwnOnly(viewer) => {
            Condition::all().add(activity_logs::Column::UserId.eq(viewer))
        }
    }
}

pub struct ActivityRepository {
    conn: DatabaseConnection,
}

impl ActivityRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(&self, entry: &NewActivity) -> Result<()> {
        insert_activity(&self.conn, entry).await
    }

    pub async fn recent(&self, scope: AuditScope, limit: u64) -> Result<Vec<ActivityRow>> {
        self.filtered(scope, &ActivityFilter::default(), Some(limit))
            .await
    }

    /// Newest first. `limit = None` returns every match.
    pub async fn filtered(
        &self,
        scope: AuditScope,
        filter: &ActivityFilter,
        limit: Option<u64>,
    ) -> Result<Vec<ActivityRow>> {
        let mut condition = Condition::all().add(scope_condition(scope));

        if let Some(user_id) = filter.user_id {
            condition = condition.add(activity_logs::Column::UserId.eq(user_id));
        }

        if let Some(action) = &filter.action {
            condition = condition.add(activity_logs::Column::Action.eq(action.as_str()));
        }

        if let Some(start) = filter.start_date {
            condition = condition.add(activity_logs::Column::Timestamp.gte(start_of_day(start)));
        }

        // Exclusive upper bound at the next midnight
        if let Some(next_day) = filter.end_date.and_then(|end| end.succ_opt()) {
            condition =
                condition.add(activity_logs::Column::Timestamp.lt(start_of_day(next_day)));
        }

        let mut query = ActivityLogs::find()
            .find_also_related(Users)
            .filter(condition)
            .order_by_desc(activity_logs::Column::Timestamp)
            .order_by_desc(activity_logs::Column::Id);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to query activity log")?;

        Ok(rows.into_iter().map(ActivityRow::from).collect())
    }

    /// Action names that occur in entries visible under `scope`.
    pub async fn distinct_actions(&self, scope: AuditScope) -> Result<Vec<String>> {
        let actions: Vec<String> = ActivityLogs::find()
            .select_only()
            .column(activity_logs::Column::Action)
            .join(JoinType::InnerJoin, activity_logs::Relation::User.def())
            .filter(scope_condition(scope))
            .distinct()
            .order_by_asc(activity_logs::Column::Action)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list activity actions")?;

        Ok(actions)
    }
}
