//! Domain primitives for accounts, roles and request identity.
//!
//! Nothing in here touches storage; the services pass these values around
//! explicitly so the rules can be exercised without a request context.

pub mod access;
pub mod policy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse-grained authorization tier.
///
/// # Examples
///
/// ```rust
/// use dirhub::domain::Role;
///
/// let role: Role = "manager".parse().unwrap();
/// assert_eq!(role, Role::Manager);
/// assert_eq!(role.to_string(), "Manager");
/// assert!(Role::Admin.at_least(Role::Manager));
/// assert!(!Role::Staff.at_least(Role::Manager));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Staff,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::Staff => "Staff",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Admin => 2,
            Self::Manager => 1,
            Self::Staff => 0,
        }
    }

    /// True when this role satisfies a gate that requires `required`.
    #[must_use]
    pub const fn at_least(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The caller of a request, resolved once by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedIdentity {
    #[must_use]
    pub fn new(user_id: i32, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" STAFF ".parse::<Role>().unwrap(), Role::Staff);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin.at_least(Role::Admin));
        assert!(Role::Admin.at_least(Role::Staff));
        assert!(Role::Manager.at_least(Role::Staff));
        assert!(!Role::Manager.at_least(Role::Admin));
        assert!(!Role::Staff.at_least(Role::Manager));
    }

    #[test]
    fn unknown_role_display() {
        let err = "guest".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown role: guest");
    }
}
