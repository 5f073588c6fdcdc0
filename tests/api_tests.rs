mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{ADMIN_PASSWORD, USER_PASSWORD, add_user, login, send, spawn_app};
use dirhub::domain::Role;
use serde_json::json;

#[tokio::test]
async fn protected_routes_need_a_session() {
    let (app, _state, _clock) = spawn_app().await;

    for uri in ["/api/auth/me", "/api/tools", "/api/activity", "/api/users"] {
        let (status, _, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn login_me_logout() {
    let (app, _state, _clock) = spawn_app().await;
    let cookie = login(&app, "admin", ADMIN_PASSWORD).await;

    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["role"], "Admin");
    assert!(body["data"]["last_login"].is_string());

    let (status, _, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_accepts_email_and_rejects_bad_credentials() {
    let (app, _state, _clock) = spawn_app().await;

    login(&app, "admin@directoryhub.com", ADMIN_PASSWORD).await;

    let (status, cookie, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": "admin", "password": "Wrong#Pass123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body["error"], "Invalid username or password");

    let (status, _, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": "nobody", "password": "Wrong#Pass123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["error"], body["error"]);
}

#[tokio::test]
async fn usernames_cannot_shadow_another_accounts_email() {
    let (app, state, _clock) = spawn_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;
    add_user(&state, "bea", Role::Staff).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({
            "username": "bea@example.com",
            "email": "mallory@example.com",
            "full_name": "Mallory",
            "password": "Mallory#Pass26",
            "role": "Staff"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({
            "username": "mallory",
            "email": "admin",
            "full_name": "Mallory",
            "password": "Mallory#Pass26",
            "role": "Staff"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already exists");

    login(&app, "bea@example.com", USER_PASSWORD).await;
}

#[tokio::test]
async fn session_of_a_deactivated_account_is_dropped() {
    let (app, state, _clock) = spawn_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;
    let staff = add_user(&state, "gus", Role::Staff).await;
    let cookie = login(&app, "gus", USER_PASSWORD).await;

    let (status, _, _) = send(&app, "DELETE", &format!("/api/users/{}", staff.id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session is no longer valid");

    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn disabled_account_cannot_log_in() {
    let (app, state, _clock) = spawn_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;
    let staff = add_user(&state, "dora", Role::Staff).await;

    let (status, _, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", staff.id),
        Some(&admin),
        Some(json!({
            "username": "dora",
            "email": "dora@example.com",
            "full_name": "Dora",
            "role": "Staff",
            "is_active": false
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": "dora", "password": USER_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_admin_is_admin_only() {
    let (app, state, _clock) = spawn_app().await;
    add_user(&state, "manny", Role::Manager).await;
    let manager = login(&app, "manny", USER_PASSWORD).await;

    let (status, _, _) = send(&app, "GET", "/api/users", Some(&manager), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, "GET", "/api/metrics", Some(&manager), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = send(&app, "GET", "/api/tools", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    let tools = body["data"].as_array().unwrap();
    assert_eq!(tools.len(), 5);
    assert!(tools.iter().all(|t| t["accessible"] == true));
}

#[tokio::test]
async fn create_user_checks_duplicates_and_policy() {
    let (app, _state, _clock) = spawn_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;

    let new_user = json!({
        "username": "nina",
        "email": "nina@example.com",
        "full_name": "Nina Park",
        "password": "Nina#Pass2026",
        "role": "Staff"
    });

    let (status, _, body) = send(&app, "POST", "/api/users", Some(&admin), Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "nina");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _, body) = send(&app, "POST", "/api/users", Some(&admin), Some(new_user)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({
            "username": "omar",
            "email": "omar@example.com",
            "full_name": "Omar",
            "password": "password",
            "role": "Staff"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, _, body) = send(&app, "GET", "/api/activity/actions", Some(&admin), None).await;
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a.as_str())
        .collect();
    assert!(actions.contains(&"user_created"));
    assert!(actions.contains(&"login"));
}

#[tokio::test]
async fn deleting_a_user_with_history_deactivates_it() {
    let (app, state, _clock) = spawn_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;
    let quiet = add_user(&state, "quiet", Role::Staff).await;
    let active = add_user(&state, "active", Role::Staff).await;
    login(&app, "active", USER_PASSWORD).await;

    let (status, _, body) = send(&app, "DELETE", &format!("/api/users/{}", quiet.id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deactivated"], false);
    assert!(state.store().users().get_by_id(quiet.id).await.unwrap().is_none());

    let (status, _, body) = send(&app, "DELETE", &format!("/api/users/{}", active.id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deactivated"], true);
    let kept = state.store().users().get_by_id(active.id).await.unwrap().unwrap();
    assert!(!kept.is_active);

    let admin_id = state.store().users().get_by_username("admin").await.unwrap().unwrap().id;
    let (status, _, _) = send(&app, "DELETE", &format!("/api/users/{admin_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_password_enforces_current_and_history() {
    let (app, state, _clock) = spawn_app().await;
    add_user(&state, "pia", Role::Staff).await;
    let cookie = login(&app, "pia", USER_PASSWORD).await;

    let change = |current: &str, new: &str, confirm: &str| {
        json!({ "current_password": current, "new_password": new, "confirm_password": confirm })
    };

    let (status, _, _) = send(&app, "PUT", "/api/auth/password", Some(&cookie), Some(change("Nope#123456", "Fresh#Pass01", "Fresh#Pass01"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, "PUT", "/api/auth/password", Some(&cookie), Some(change(USER_PASSWORD, "Fresh#Pass01", "Fresh#Pass02"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, "PUT", "/api/auth/password", Some(&cookie), Some(change(USER_PASSWORD, USER_PASSWORD, USER_PASSWORD))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Cannot reuse"));

    let (status, _, _) = send(&app, "PUT", "/api/auth/password", Some(&cookie), Some(change(USER_PASSWORD, "Fresh#Pass01", "Fresh#Pass01"))).await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "pia", "Fresh#Pass01").await;
}

#[tokio::test]
async fn expired_password_forces_a_reset() {
    let (app, state, clock) = spawn_app().await;
    add_user(&state, "rex", Role::Staff).await;
    clock.advance(Duration::days(91));

    let (status, cookie, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": "rex", "password": USER_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(cookie.is_none());
    let token = body["data"]["reset_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let (status, _, _) = send(
        &app,
        "POST",
        &format!("/api/auth/reset/{token}"),
        None,
        Some(json!({ "password": "Renewed#Pass1", "confirm_password": "Renewed#Pass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&app, "rex", "Renewed#Pass1").await;

    let (status, _, _) = send(
        &app,
        "POST",
        &format!("/api/auth/reset/{token}"),
        None,
        Some(json!({ "password": "Another#Pass2", "confirm_password": "Another#Pass2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_request_answers_uniformly() {
    let (app, _state, _clock) = spawn_app().await;

    let (known_status, _, known) = send(
        &app,
        "POST",
        "/api/auth/reset-request",
        None,
        Some(json!({ "email": "admin@directoryhub.com" })),
    )
    .await;
    let (unknown_status, _, unknown) = send(
        &app,
        "POST",
        "/api/auth/reset-request",
        None,
        Some(json!({ "email": "ghost@example.com" })),
    )
    .await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);
    assert!(known["data"].get("reset_token").is_none());
}

#[tokio::test]
async fn activity_feed_is_scoped_for_staff() {
    let (app, state, _clock) = spawn_app().await;
    login(&app, "admin", ADMIN_PASSWORD).await;
    add_user(&state, "tia", Role::Staff).await;
    let staff = login(&app, "tia", USER_PASSWORD).await;

    let (status, _, body) = send(&app, "GET", "/api/activity?limit=50", Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["username"], "tia");

    let (status, _, _) = send(&app, "GET", "/api/activity/filter", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, "GET", "/api/activity/actions", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (app, _state, _clock) = spawn_app().await;

    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/api/auth/me")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"));
}
