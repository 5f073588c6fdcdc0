use crate::config::Config;
use crate::domain::access::AuditScope;
use crate::state::SharedState;

/// Operator view of the log; not limited by role.
pub async fn cmd_activity(config: Config, limit: u64) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;
    let entries = state
        .store
        .activity()
        .recent(AuditScope::All, limit.max(1))
        .await?;

    if entries.is_empty() {
        println!("No activity recorded.");
        return Ok(());
    }

    println!("Recent Activity (last {}):", entries.len());
    println!("{:-<70}", "");

    for entry in entries {
        let actor = entry.username.as_deref().unwrap_or("unknown");
        println!("• {} {} by {}", entry.timestamp, entry.action, actor);
        if let Some(details) = &entry.details {
            println!("  {details}");
        }
    }

    Ok(())
}
