use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::ClientOrigin;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::RemovalOutcome;
use crate::domain::AuthenticatedIdentity;
use crate::entities::permissions;
use crate::services::{CreateUserRequest, UpdateUserRequest, UserSummary};

#[derive(Deserialize)]
pub struct AdminResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Serialize)]
pub struct DeleteUserResponse {
    pub message: String,
    /// `true` when the account had audit history and was disabled instead.
    pub deactivated: bool,
}

#[derive(Deserialize)]
pub struct PermissionsRequest {
    /// Tool id to access flag. Tools left out get no explicit row.
    pub permissions: BTreeMap<i32, bool>,
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    let users = state.users().list_users(&admin).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let user = state.users().create_user(&admin, payload, &origin).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let user = state.users().get_user(&admin, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let user = state
        .users()
        .update_user(&admin, id, payload, &origin)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// POST /users/{id}/reset-password
pub async fn reset_user_password(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<i32>,
    Json(payload): Json<AdminResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .users()
        .reset_user_password(
            &admin,
            id,
            &payload.password,
            &payload.confirm_password,
            &origin,
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password has been reset",
    ))))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<DeleteUserResponse>>, ApiError> {
    let outcome = state.users().delete_user(&admin, id, &origin).await?;

    let response = match outcome {
        RemovalOutcome::Deleted => DeleteUserResponse {
            message: "User has been deleted".to_string(),
            deactivated: false,
        },
        RemovalOutcome::Deactivated => DeleteUserResponse {
            message: "User has activity history and was deactivated".to_string(),
            deactivated: true,
        },
    };

    Ok(Json(ApiResponse::success(response)))
}

/// GET /users/{id}/permissions
pub async fn get_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<permissions::Model>>>, ApiError> {
    let rows = state.shared.access.permissions_of(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// PUT /users/{id}/permissions
pub async fn set_permissions(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    Path(id): Path<i32>,
    Json(payload): Json<PermissionsRequest>,
) -> Result<Json<ApiResponse<Vec<permissions::Model>>>, ApiError> {
    state
        .shared
        .access
        .set_permissions(&admin, id, &payload.permissions, &origin)
        .await?;

    let rows = state.shared.access.permissions_of(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}
