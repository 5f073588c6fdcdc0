pub mod access;
pub use access::{AccessService, ToolAccess};

pub mod audit;
pub use audit::AuditService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, CurrentUser, LoginOutcome, RequestOrigin};
pub use auth_service_impl::SeaOrmAuthService;

pub mod bootstrap;

pub mod credentials;
pub use credentials::CredentialService;

pub mod scheduler;
pub use scheduler::Scheduler;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{CreateUserRequest, UpdateUserRequest, UserAdminService, UserSummary};
pub use user_service_impl::SeaOrmUserAdminService;
