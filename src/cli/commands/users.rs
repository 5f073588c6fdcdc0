//! Account commands

use crate::config::Config;
use crate::db::NewUser;
use crate::domain::Role;
use crate::state::SharedState;

pub struct CreateUserArgs {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub password: String,
    pub department: Option<String>,
}

pub async fn cmd_create_user(config: Config, args: CreateUserArgs) -> anyhow::Result<()> {
    let role: Role = args.role.parse()?;
    let state = SharedState::new(config).await?;

    let user = NewUser {
        username: args.username.trim().to_string(),
        email: args.email.trim().to_string(),
        full_name: args.full_name.trim().to_string(),
        phone_number: None,
        department: args.department.filter(|d| !d.trim().is_empty()),
        role,
        is_active: true,
    };

    let created = state.provisioner.provision(user, &args.password, None).await?;

    println!(
        "✓ Created {} ({}) with ID {}",
        created.username, created.role, created.id
    );
    Ok(())
}

pub async fn cmd_list_users(config: Config) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;
    let users = state.store.users().list_all().await?;

    if users.is_empty() {
        println!("No accounts.");
        return Ok(());
    }

    println!("Accounts ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let status = if user.is_active { "active" } else { "disabled" };
        println!("{:>4}  {:<20} {:<8} {}", user.id, user.username, user.role, status);
        println!(
            "      {} | last login: {}",
            user.email,
            user.last_login.as_deref().unwrap_or("never")
        );
    }

    Ok(())
}
