mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{USER_PASSWORD, add_user, spawn_app};
use dirhub::api::AppState;
use dirhub::config::SecurityConfig;
use dirhub::domain::Role;
use dirhub::entities::users;
use dirhub::services::{AuthError, CredentialService, RequestOrigin};

async fn reload(state: &AppState, user_id: i32) -> users::Model {
    state.store().users().get_by_id(user_id).await.unwrap().unwrap()
}

#[tokio::test]
async fn set_then_check_password() {
    let (_app, state, _clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "alice", Role::Staff).await;

    creds.set_password(user.id, "Xx1!aaaaaa").await.unwrap();

    let user = reload(&state, user.id).await;
    assert!(creds.check_password(&user, "Xx1!aaaaaa").await.unwrap());
    assert!(!creds.check_password(&user, "wrong").await.unwrap());
}

#[tokio::test]
async fn history_keeps_only_the_last_five() {
    let (_app, state, _clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "bob", Role::Staff).await;

    let passwords = [
        "First#Pass1",
        "Second#Pass2",
        "Third#Pass3",
        "Fourth#Pass4",
        "Fifth#Pass5",
        "Sixth#Pass6",
    ];

    for password in &passwords[..5] {
        creds.set_password(user.id, password).await.unwrap();
    }
    assert!(creds.is_password_in_history(user.id, passwords[0]).await.unwrap());

    creds.set_password(user.id, passwords[5]).await.unwrap();
    assert!(!creds.is_password_in_history(user.id, passwords[0]).await.unwrap());

    // The current password is the newest history entry.
    assert!(matches!(
        creds.vet_new_password(user.id, passwords[5]).await,
        Err(AuthError::PasswordReused)
    ));
    assert!(creds.vet_new_password(user.id, passwords[0]).await.is_ok());
}

#[tokio::test]
async fn vet_checks_policy_before_history() {
    let (_app, state, _clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "carol", Role::Staff).await;

    assert!(matches!(
        creds.vet_new_password(user.id, "Password123").await,
        Err(AuthError::PolicyViolation)
    ));
    assert!(matches!(
        creds.vet_new_password(user.id, USER_PASSWORD).await,
        Err(AuthError::PasswordReused)
    ));
}

#[tokio::test]
async fn password_expires_after_ninety_days() {
    let (_app, state, clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "dave", Role::Staff).await;

    creds.set_password(user.id, "Fresh#Pass01").await.unwrap();
    assert!(!creds.is_password_expired(&reload(&state, user.id).await).unwrap());

    clock.advance(Duration::days(90));
    assert!(!creds.is_password_expired(&reload(&state, user.id).await).unwrap());

    clock.advance(Duration::days(1));
    assert!(creds.is_password_expired(&reload(&state, user.id).await).unwrap());

    creds.set_password(user.id, "Renewed#Pass02").await.unwrap();
    assert!(!creds.is_password_expired(&reload(&state, user.id).await).unwrap());
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let (_app, state, clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "erin", Role::Staff).await;

    let token = creds.issue_reset_token(user.id).await.unwrap();
    clock.advance(Duration::hours(25));

    assert!(!creds.is_token_valid(&token).await.unwrap());
    assert!(matches!(
        creds
            .redeem_reset_token(&token, "Brand#New123", &RequestOrigin::default())
            .await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn used_reset_token_is_rejected() {
    let (_app, state, _clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "frank", Role::Staff).await;

    let token = creds.issue_reset_token(user.id).await.unwrap();
    let redeemed_for = creds
        .redeem_reset_token(&token, "Brand#New123", &RequestOrigin::default())
        .await
        .unwrap();
    assert_eq!(redeemed_for, user.id);

    assert!(matches!(
        creds
            .redeem_reset_token(&token, "Another#New456", &RequestOrigin::default())
            .await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn policy_failure_leaves_token_usable() {
    let (_app, state, _clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "grace", Role::Staff).await;

    let token = creds.issue_reset_token(user.id).await.unwrap();

    assert!(matches!(
        creds
            .redeem_reset_token(&token, "weak", &RequestOrigin::default())
            .await,
        Err(AuthError::PolicyViolation)
    ));
    assert!(creds.is_token_valid(&token).await.unwrap());

    creds
        .redeem_reset_token(&token, "Strong#Pass99", &RequestOrigin::default())
        .await
        .unwrap();

    let user = reload(&state, user.id).await;
    assert!(creds.check_password(&user, "Strong#Pass99").await.unwrap());
    assert!(!creds.is_token_valid(&token).await.unwrap());
}

#[tokio::test]
async fn reusing_the_current_password_keeps_the_token() {
    let (_app, state, _clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "ivan", Role::Staff).await;

    let token = creds.issue_reset_token(user.id).await.unwrap();

    assert!(matches!(
        creds
            .redeem_reset_token(&token, USER_PASSWORD, &RequestOrigin::default())
            .await,
        Err(AuthError::PasswordReused)
    ));
    assert!(creds.is_token_valid(&token).await.unwrap());

    let user = reload(&state, user.id).await;
    assert!(creds.check_password(&user, USER_PASSWORD).await.unwrap());
}

#[tokio::test]
async fn oversized_windows_fail_without_panicking() {
    let (_app, state, clock) = spawn_app().await;
    let user = add_user(&state, "judy", Role::Staff).await;

    let mut security = SecurityConfig::default();
    security.password_policy.expiry_days = i64::MAX / 1000;
    security.password_policy.reset_token_ttl_hours = i64::MAX;
    let creds = CredentialService::new(state.store().clone(), Arc::new(clock.clone()), security);

    assert!(matches!(
        creds.is_password_expired(&user),
        Err(AuthError::Internal(_))
    ));
    assert!(matches!(
        creds.issue_reset_token(user.id).await,
        Err(AuthError::Internal(_))
    ));
}

#[tokio::test]
async fn purge_removes_used_and_expired_tokens() {
    let (_app, state, clock) = spawn_app().await;
    let creds = &state.shared.credentials;
    let user = add_user(&state, "heidi", Role::Staff).await;

    let used = creds.issue_reset_token(user.id).await.unwrap();
    creds
        .redeem_reset_token(&used, "Brand#New123", &RequestOrigin::default())
        .await
        .unwrap();
    let _stale = creds.issue_reset_token(user.id).await.unwrap();

    clock.advance(Duration::hours(23));
    let live = creds.issue_reset_token(user.id).await.unwrap();
    clock.advance(Duration::hours(2));

    assert_eq!(creds.purge_stale_tokens().await.unwrap(), 2);
    assert!(creds.is_token_valid(&live).await.unwrap());
}
