pub mod prelude;

pub mod activity_logs;
pub mod password_history;
pub mod password_reset_tokens;
pub mod permissions;
pub mod tools;
pub mod users;
