mod activity;
mod tokens;
mod users;

pub use activity::cmd_activity;
pub use tokens::{cmd_issue_reset_token, cmd_purge_tokens};
pub use users::{CreateUserArgs, cmd_create_user, cmd_list_users};
