#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use dirhub::api::{self, AppState};
use dirhub::clock::ManualClock;
use dirhub::config::Config;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "ChangeMe123!";

/// Fresh SQLite file per call, cheap Argon2 parameters.
pub fn test_config() -> Config {
    let mut config = Config::default();
    let path = std::env::temp_dir().join(format!("dirhub-test-{}.db", uuid::Uuid::new_v4()));
    config.general.database_path = format!("sqlite:{}", path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config.bootstrap.admin_password = ADMIN_PASSWORD.to_string();
    config
}

pub fn start_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
}

pub async fn spawn_state(config: Config, clock: &ManualClock) -> Arc<AppState> {
    api::create_app_state_with_clock(config, Arc::new(clock.clone()), None)
        .await
        .expect("Failed to create app state")
}

pub async fn spawn_app() -> (Router, Arc<AppState>, ManualClock) {
    let clock = start_clock();
    let state = spawn_state(test_config(), &clock).await;
    (api::router(state.clone()), state, clock)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, set_cookie, json)
}

/// Logs in and returns the session cookie.
pub async fn login(app: &Router, login: &str, password: &str) -> String {
    let (status, cookie, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "login": login, "password": password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    cookie.expect("login should set a session cookie")
}

pub const USER_PASSWORD: &str = "Password123!";

/// Creates an active account directly through the provisioning path.
pub async fn add_user(
    state: &AppState,
    username: &str,
    role: dirhub::domain::Role,
) -> dirhub::entities::users::Model {
    let user = dirhub::db::NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: username.to_string(),
        phone_number: None,
        department: None,
        role,
        is_active: true,
    };

    state
        .shared
        .provisioner
        .provision(user, USER_PASSWORD, None)
        .await
        .expect("Failed to provision user")
}
