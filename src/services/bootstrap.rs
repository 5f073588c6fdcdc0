//! First-start account seeding.

use anyhow::Result;
use tracing::{info, warn};

use crate::config::BootstrapConfig;
use crate::db::{NewUser, Store};
use crate::domain::Role;
use crate::services::user_service_impl::SeaOrmUserAdminService;

/// Demo accounts created next to the admin when `seed_demo_users` is set.
/// They share the admin's bootstrap password.
const DEMO_USERS: [(&str, &str, &str, Role, &str); 2] = [
    (
        "manager",
        "manager@directoryhub.com",
        "Manager User",
        Role::Manager,
        "Sales",
    ),
    (
        "staff",
        "staff@directoryhub.com",
        "Staff User",
        Role::Staff,
        "Support",
    ),
];

/// Creates the configured accounts when the users table is empty.
/// Returns `true` when anything was created.
pub async fn ensure_bootstrap_users(
    store: &Store,
    users: &SeaOrmUserAdminService,
    config: &BootstrapConfig,
) -> Result<bool> {
    if store.users().count().await? > 0 {
        return Ok(false);
    }

    let admin = NewUser {
        username: config.admin_username.clone(),
        email: config.admin_email.clone(),
        full_name: config.admin_full_name.clone(),
        phone_number: None,
        department: Some("Administration".to_string()),
        role: Role::Admin,
        is_active: true,
    };

    users
        .provision(admin, &config.admin_password, None)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create bootstrap admin: {e}"))?;

    info!(username = %config.admin_username, "Created bootstrap admin account");
    warn!("Change the bootstrap admin password after first login");

    if config.seed_demo_users {
        for (username, email, full_name, role, department) in DEMO_USERS {
            let user = NewUser {
                username: username.to_string(),
                email: email.to_string(),
                full_name: full_name.to_string(),
                phone_number: None,
                department: Some(department.to_string()),
                role,
                is_active: true,
            };

            users
                .provision(user, &config.admin_password, None)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create demo user {username}: {e}"))?;
        }

        info!("Created demo manager and staff accounts");
    }

    Ok(true)
}
