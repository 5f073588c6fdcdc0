use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, LimitQuery};
use crate::db::{ActivityFilter, ActivityRow};
use crate::domain::AuthenticatedIdentity;
use crate::services::audit::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Deserialize)]
pub struct ActivityFilterQuery {
    pub user_id: Option<i32>,
    pub action: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub end_date: Option<String>,
}

fn parse_day(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{field} must be YYYY-MM-DD"))),
    }
}

impl ActivityFilterQuery {
    fn into_filter(self) -> Result<ActivityFilter, ApiError> {
        Ok(ActivityFilter {
            start_date: parse_day(self.start_date.as_deref(), "start_date")?,
            end_date: parse_day(self.end_date.as_deref(), "end_date")?,
            user_id: self.user_id,
            action: self
                .action
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        })
    }
}

/// GET /activity
pub async fn recent_activity(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityRow>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let rows = state.shared.audit.recent(&identity, limit).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /activity/filter
pub async fn filter_activity(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Query(query): Query<ActivityFilterQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityRow>>>, ApiError> {
    let filter = query.into_filter()?;
    let rows = state.shared.audit.filter(&identity, &filter).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /activity/actions
pub async fn list_actions(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let actions = state.shared.audit.actions(&identity).await?;
    Ok(Json(ApiResponse::success(actions)))
}
