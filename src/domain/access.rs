//! Tool access resolution and role gates.

use super::{AuthenticatedIdentity, Role};

/// Resolves whether a user of `role` may use a tool.
///
/// Precedence: Admin short-circuit, then the explicit per-user override, then
/// the role default (Managers allowed, Staff follow the tool's own flag).
/// `tool_staff_default` is `None` when the tool does not exist, which denies.
#[must_use]
pub const fn resolve_access(
    role: Role,
    explicit: Option<bool>,
    tool_staff_default: Option<bool>,
) -> bool {
    if matches!(role, Role::Admin) {
        return true;
    }

    if let Some(can_access) = explicit {
        return can_access;
    }

    match (tool_staff_default, role) {
        (None, _) => false,
        (Some(_), Role::Manager | Role::Admin) => true,
        (Some(staff_default), Role::Staff) => staff_default,
    }
}

/// Pure role gate. Returns `true` when `identity` may enter an area that
/// requires `required`.
#[must_use]
pub const fn satisfies(identity_role: Role, required: Role) -> bool {
    identity_role.at_least(required)
}

/// Which actors' activity a viewer may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditScope {
    /// Everything.
    All,
    /// Staff members' entries plus the viewing manager's own.
    StaffAndSelf(i32),
    /// Only the viewer's own entries.
    OwnOnly(i32),
}

impl AuditScope {
    #[must_use]
    pub const fn for_identity(identity: &AuthenticatedIdentity) -> Self {
        match identity.role {
            Role::Admin => Self::All,
            Role::Manager => Self::StaffAndSelf(identity.user_id),
            Role::Staff => Self::OwnOnly(identity.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_bypasses_everything() {
        assert!(resolve_access(Role::Admin, None, None));
        assert!(resolve_access(Role::Admin, Some(false), Some(false)));
    }

    #[test]
    fn explicit_override_wins_over_role_default() {
        assert!(!resolve_access(Role::Manager, Some(false), Some(true)));
        assert!(resolve_access(Role::Staff, Some(true), Some(false)));
    }

    #[test]
    fn role_defaults_apply_without_override() {
        assert!(resolve_access(Role::Manager, None, Some(false)));
        assert!(resolve_access(Role::Staff, None, Some(true)));
        assert!(!resolve_access(Role::Staff, None, Some(false)));
    }

    #[test]
    fn missing_tool_denies_non_admins() {
        assert!(!resolve_access(Role::Manager, None, None));
        assert!(!resolve_access(Role::Staff, None, None));
    }

    #[test]
    fn gates() {
        assert!(satisfies(Role::Admin, Role::Manager));
        assert!(satisfies(Role::Manager, Role::Manager));
        assert!(!satisfies(Role::Staff, Role::Manager));
        assert!(!satisfies(Role::Manager, Role::Admin));
    }

    #[test]
    fn audit_scope_visibility() {
        let manager = AuthenticatedIdentity::new(2, "manager", Role::Manager);
        assert_eq!(
            AuditScope::for_identity(&manager),
            AuditScope::StaffAndSelf(2)
        );

        let staff = AuthenticatedIdentity::new(7, "staff", Role::Staff);
        assert_eq!(AuditScope::for_identity(&staff), AuditScope::OwnOnly(7));

        let admin = AuthenticatedIdentity::new(1, "admin", Role::Admin);
        assert_eq!(AuditScope::for_identity(&admin), AuditScope::All);
    }
}
