mod common;

use std::collections::BTreeMap;

use common::{add_user, spawn_app};
use dirhub::api::AppState;
use dirhub::db::{ActivityFilter, NewTool};
use dirhub::domain::{AuthenticatedIdentity, Role};
use dirhub::entities::{tools, users};
use dirhub::services::{AuthError, RequestOrigin};

fn identity(user: &users::Model) -> AuthenticatedIdentity {
    AuthenticatedIdentity::new(user.id, user.username.clone(), user.role.parse().unwrap())
}

async fn admin(state: &AppState) -> users::Model {
    state
        .store()
        .users()
        .get_by_username("admin")
        .await
        .unwrap()
        .expect("bootstrap admin")
}

async fn restricted_tool(state: &AppState) -> tools::Model {
    let admin = admin(state).await;
    state
        .shared
        .access
        .create_tool(
            &identity(&admin),
            NewTool {
                name: "Payroll Export".to_string(),
                description: Some("Finance only".to_string()),
                url: Some("/tools/payroll".to_string()),
                icon: None,
                staff_default_access: false,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn admin_bypasses_everything() {
    let (_app, state, _clock) = spawn_app().await;
    let access = &state.shared.access;
    let admin = admin(&state).await;
    let tool = restricted_tool(&state).await;

    assert!(access.has_permission(admin.id, tool.id).await.unwrap());

    let mut rows = BTreeMap::new();
    rows.insert(tool.id, false);
    access
        .set_permissions(&identity(&admin), admin.id, &rows, &RequestOrigin::default())
        .await
        .unwrap();

    assert!(access.has_permission(admin.id, tool.id).await.unwrap());
}

#[tokio::test]
async fn staff_follow_tool_default() {
    let (_app, state, _clock) = spawn_app().await;
    let access = &state.shared.access;
    let staff = add_user(&state, "sam", Role::Staff).await;
    let restricted = restricted_tool(&state).await;
    let seeded = state
        .store()
        .tools()
        .get_by_name("Email Marketing")
        .await
        .unwrap()
        .unwrap();

    assert!(!access.has_permission(staff.id, restricted.id).await.unwrap());
    assert!(access.has_permission(staff.id, seeded.id).await.unwrap());
}

#[tokio::test]
async fn manager_defaults_to_allowed_until_overridden() {
    let (_app, state, _clock) = spawn_app().await;
    let access = &state.shared.access;
    let admin = admin(&state).await;
    let manager = add_user(&state, "mia", Role::Manager).await;
    let tool = restricted_tool(&state).await;

    assert!(access.has_permission(manager.id, tool.id).await.unwrap());

    let mut rows = BTreeMap::new();
    rows.insert(tool.id, false);
    access
        .set_permissions(&identity(&admin), manager.id, &rows, &RequestOrigin::default())
        .await
        .unwrap();

    assert!(!access.has_permission(manager.id, tool.id).await.unwrap());

    let listed = access.tools_for(&identity(&manager)).await.unwrap();
    let entry = listed.iter().find(|t| t.tool.id == tool.id).unwrap();
    assert!(!entry.accessible);
}

#[tokio::test]
async fn unknown_tool_denies() {
    let (_app, state, _clock) = spawn_app().await;
    let manager = add_user(&state, "max", Role::Manager).await;

    assert!(!state.shared.access.has_permission(manager.id, 9999).await.unwrap());
}

#[tokio::test]
async fn permission_replacement_is_total_and_audited() {
    let (_app, state, _clock) = spawn_app().await;
    let access = &state.shared.access;
    let admin = admin(&state).await;
    let staff = add_user(&state, "sue", Role::Staff).await;
    let tools = state.store().tools().list_all().await.unwrap();

    let mut first = BTreeMap::new();
    first.insert(tools[0].id, false);
    first.insert(tools[1].id, false);
    access
        .set_permissions(&identity(&admin), staff.id, &first, &RequestOrigin::default())
        .await
        .unwrap();

    let mut second = BTreeMap::new();
    second.insert(tools[2].id, true);
    access
        .set_permissions(&identity(&admin), staff.id, &second, &RequestOrigin::default())
        .await
        .unwrap();

    let rows = access.permissions_of(staff.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tool_id, tools[2].id);

    let by_admin = ActivityFilter {
        user_id: Some(admin.id),
        action: Some("permissions_updated".to_string()),
        ..ActivityFilter::default()
    };
    let audited = state
        .shared
        .audit
        .filter(&identity(&admin), &by_admin)
        .await
        .unwrap();
    assert_eq!(audited.len(), 2);
}

#[tokio::test]
async fn permission_changes_need_an_admin_and_known_targets() {
    let (_app, state, _clock) = spawn_app().await;
    let access = &state.shared.access;
    let admin = admin(&state).await;
    let manager = add_user(&state, "mo", Role::Manager).await;
    let staff = add_user(&state, "stu", Role::Staff).await;

    let rows = BTreeMap::new();
    assert!(matches!(
        access
            .set_permissions(&identity(&manager), staff.id, &rows, &RequestOrigin::default())
            .await,
        Err(AuthError::PermissionDenied)
    ));

    assert!(matches!(
        access
            .set_permissions(&identity(&admin), 4242, &rows, &RequestOrigin::default())
            .await,
        Err(AuthError::NotFound(_))
    ));

    let mut unknown_tool = BTreeMap::new();
    unknown_tool.insert(4242, true);
    assert!(matches!(
        access
            .set_permissions(&identity(&admin), staff.id, &unknown_tool, &RequestOrigin::default())
            .await,
        Err(AuthError::NotFound(_))
    ));
}

#[tokio::test]
async fn rejected_replacement_keeps_existing_rows() {
    let (_app, state, _clock) = spawn_app().await;
    let access = &state.shared.access;
    let admin = admin(&state).await;
    let staff = add_user(&state, "sam", Role::Staff).await;
    let tools = state.store().tools().list_all().await.unwrap();

    let mut current = BTreeMap::new();
    current.insert(tools[0].id, false);
    access
        .set_permissions(&identity(&admin), staff.id, &current, &RequestOrigin::default())
        .await
        .unwrap();

    let mut mixed = BTreeMap::new();
    mixed.insert(tools[1].id, true);
    mixed.insert(4242, true);
    assert!(matches!(
        access
            .set_permissions(&identity(&admin), staff.id, &mixed, &RequestOrigin::default())
            .await,
        Err(AuthError::NotFound(_))
    ));

    let rows = access.permissions_of(staff.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tool_id, tools[0].id);
    assert!(!rows[0].can_access);
    assert!(!access.has_permission(staff.id, tools[0].id).await.unwrap());
}
