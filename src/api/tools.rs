use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::db::NewTool;
use crate::domain::AuthenticatedIdentity;
use crate::entities::tools;
use crate::services::ToolAccess;

#[derive(Deserialize)]
pub struct CreateToolRequest {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    #[serde(default = "default_staff_access")]
    pub staff_default_access: bool,
}

const fn default_staff_access() -> bool {
    true
}

#[derive(Serialize)]
pub struct AccessCheckResponse {
    pub tool_id: i32,
    pub accessible: bool,
}

/// GET /tools
pub async fn list_tools(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Json<ApiResponse<Vec<ToolAccess>>>, ApiError> {
    let tools = state.shared.access.tools_for(&identity).await?;
    Ok(Json(ApiResponse::success(tools)))
}

/// GET /tools/{id}/access
pub async fn check_access(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccessCheckResponse>>, ApiError> {
    let accessible = state
        .shared
        .access
        .has_permission(identity.user_id, id)
        .await?;

    Ok(Json(ApiResponse::success(AccessCheckResponse {
        tool_id: id,
        accessible,
    })))
}

/// POST /tools
pub async fn create_tool(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    Json(payload): Json<CreateToolRequest>,
) -> Result<Json<ApiResponse<tools::Model>>, ApiError> {
    let tool = state
        .shared
        .access
        .create_tool(
            &admin,
            NewTool {
                name: payload.name.trim().to_string(),
                description: payload.description,
                url: payload.url,
                icon: payload.icon,
                staff_default_access: payload.staff_default_access,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(tool)))
}
