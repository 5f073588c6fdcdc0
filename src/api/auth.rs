use axum::{
    Extension, Json,
    extract::{ConnectInfo, FromRequestParts, Path, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_sessions::{Expiry, Session};
use tracing::warn;

use super::observability::RequestSpan;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::{AuthenticatedIdentity, Role};
use crate::services::{CurrentUser, LoginOutcome, RequestOrigin};

const SESSION_USER_KEY: &str = "user_id";
const REMEMBER_ME_DAYS: i64 = 30;
const RESET_REQUEST_MESSAGE: &str =
    "If your email is registered, you will receive a password reset link";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email address.
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct PasswordExpiredResponse {
    pub reset_token: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct ResetRequestResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

// ============================================================================
// Extractors
// ============================================================================

/// Caller address for the audit trail: the socket peer when known, otherwise
/// the first `X-Forwarded-For` hop.
pub struct ClientOrigin(pub RequestOrigin);

impl<S> FromRequestParts<S> for ClientOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let forwarded = || {
            parts
                .headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self(RequestOrigin {
            ip_address: peer.or_else(forwarded),
        }))
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the session's user id into an [`AuthenticatedIdentity`] request
/// extension. Sessions of disabled or deleted accounts are flushed.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let Some(identity) = state.auth().resolve_identity(user_id).await? else {
        if let Err(e) = session.flush().await {
            warn!(user_id, error = %e, "Failed to flush session of inactive account");
        }
        return Err(ApiError::unauthorized("Session is no longer valid"));
    };

    if let Some(RequestSpan(span)) = request.extensions().get::<RequestSpan>() {
        span.record("user_id", identity.user_id);
    }
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Route gate for Admin-only subtrees. Runs after [`auth_middleware`].
pub async fn require_admin(
    Extension(identity): Extension<AuthenticatedIdentity>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !identity.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientOrigin(origin): ClientOrigin,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    match state
        .auth()
        .login(&payload.login, &payload.password, &origin)
        .await?
    {
        LoginOutcome::Authenticated(identity) => {
            session
                .cycle_id()
                .await
                .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
            session
                .insert(SESSION_USER_KEY, identity.user_id)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

            if payload.remember {
                session.set_expiry(Some(Expiry::OnInactivity(time::Duration::days(
                    REMEMBER_ME_DAYS,
                ))));
            }

            Ok(Json(ApiResponse::success(LoginResponse {
                user_id: identity.user_id,
                username: identity.username,
                role: identity.role,
            }))
            .into_response())
        }
        LoginOutcome::PasswordExpired { reset_token, .. } => {
            let body = ApiResponse {
                success: false,
                data: Some(PasswordExpiredResponse { reset_token }),
                error: Some("Your password has expired. Please reset your password.".to_string()),
            };
            Ok((StatusCode::FORBIDDEN, Json(body)).into_response())
        }
    }
}

/// POST /auth/logout
/// The logout is audited before the session is destroyed.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth().logout(&identity, &origin).await?;

    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to end session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "You have been logged out",
    ))))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Json<ApiResponse<CurrentUser>>, ApiError> {
    let user = state.auth().current_user(&identity).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    ClientOrigin(origin): ClientOrigin,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth()
        .change_password(
            &identity,
            &payload.current_password,
            &payload.new_password,
            &payload.confirm_password,
            &origin,
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Your password has been updated",
    ))))
}

/// POST /auth/reset-request
/// Same answer whether or not the address is registered.
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ApiResponse<ResetRequestResponse>>, ApiError> {
    let token = state.auth().request_reset(&payload.email).await?;

    let reset_token = if state.config().security.expose_reset_tokens {
        token
    } else {
        None
    };

    Ok(Json(ApiResponse::success(ResetRequestResponse {
        message: RESET_REQUEST_MESSAGE.to_string(),
        reset_token,
    })))
}

/// POST /auth/reset/{token}
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    ClientOrigin(origin): ClientOrigin,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth()
        .reset_password(&token, &payload.password, &payload.confirm_password, &origin)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Your password has been reset. You can now log in.",
    ))))
}
