use crate::config::Config;
use crate::services::scheduler::run_token_cleanup;
use crate::state::SharedState;

pub async fn cmd_issue_reset_token(config: Config, login: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    let Some(user) = state.store.users().get_by_login(login.trim()).await? else {
        println!("No account matches '{login}'.");
        return Ok(());
    };

    let token = state.credentials.issue_reset_token(user.id).await?;
    let ttl = state.config.security.password_policy.reset_token_ttl_hours;

    println!("Reset token for {} (valid {ttl}h):", user.username);
    println!("{token}");
    Ok(())
}

pub async fn cmd_purge_tokens(config: Config) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;
    run_token_cleanup(&state.credentials).await;
    Ok(())
}
