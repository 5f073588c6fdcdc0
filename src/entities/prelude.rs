pub use super::activity_logs::Entity as ActivityLogs;
pub use super::password_history::Entity as PasswordHistory;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::permissions::Entity as Permissions;
pub use super::tools::Entity as Tools;
pub use super::users::Entity as Users;
