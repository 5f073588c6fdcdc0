//! Tool access evaluation and permission administration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::clock::Clock;
use crate::db::{NewActivity, NewTool, Store};
use crate::domain::access::resolve_access;
use crate::domain::{AuthenticatedIdentity, Role};
use crate::entities::{permissions, tools};
use crate::services::auth_service::{AuthError, RequestOrigin};

/// A tool as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct ToolAccess {
    #[serde(flatten)]
    pub tool: tools::Model,
    pub accessible: bool,
}

pub struct AccessService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl AccessService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Admin short-circuit, then the explicit row, then the role default.
    /// A missing tool denies.
    pub async fn has_permission(&self, user_id: i32, tool_id: i32) -> Result<bool, AuthError> {
        let user = self
            .store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))?;

        let role = parse_role(&user.role)?;
        if role == Role::Admin {
            return Ok(true);
        }

        let Some(tool) = self.store.tools().get(tool_id).await? else {
            return Ok(false);
        };

        let explicit = self.store.permissions().explicit(user_id, tool_id).await?;
        Ok(resolve_access(role, explicit, Some(tool.staff_default_access)))
    }

    /// Every tool with the identity's resolved access flag.
    pub async fn tools_for(
        &self,
        identity: &AuthenticatedIdentity,
    ) -> Result<Vec<ToolAccess>, AuthError> {
        let tools = self.store.tools().list_all().await?;
        let overrides: BTreeMap<i32, bool> = self
            .store
            .permissions()
            .list_for_user(identity.user_id)
            .await?
            .into_iter()
            .map(|p| (p.tool_id, p.can_access))
            .collect();

        Ok(tools
            .into_iter()
            .map(|tool| {
                let accessible = resolve_access(
                    identity.role,
                    overrides.get(&tool.id).copied(),
                    Some(tool.staff_default_access),
                );
                ToolAccess { tool, accessible }
            })
            .collect())
    }

    pub async fn permissions_of(&self, user_id: i32) -> Result<Vec<permissions::Model>, AuthError> {
        self.ensure_user(user_id).await?;
        Ok(self.store.permissions().list_for_user(user_id).await?)
    }

    /// Replaces all of `target_user_id`'s explicit rows with `access`.
    ///
    /// # Errors
    ///
    /// [`AuthError::PermissionDenied`] unless `admin` is an Admin;
    /// [`AuthError::NotFound`] for an unknown user or tool id.
    pub async fn set_permissions(
        &self,
        admin: &AuthenticatedIdentity,
        target_user_id: i32,
        access: &BTreeMap<i32, bool>,
        origin: &RequestOrigin,
    ) -> Result<(), AuthError> {
        if !admin.is_admin() {
            return Err(AuthError::PermissionDenied);
        }

        let target = self.ensure_user(target_user_id).await?;

        let known: Vec<i32> = self
            .store
            .tools()
            .list_all()
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if let Some(missing) = access.keys().find(|id| !known.contains(id)) {
            return Err(AuthError::NotFound(format!("Tool {missing}")));
        }

        let audit = NewActivity::new(admin.user_id, "permissions_updated", self.clock.now())
            .details(format!("Updated permissions for user: {}", target.username))
            .origin(origin.ip_address.clone());

        self.store
            .permissions()
            .replace_for_user(target_user_id, access, audit)
            .await?;

        info!(
            admin = %admin.username,
            target = %target.username,
            tools = access.len(),
            "Permissions replaced"
        );
        Ok(())
    }

    pub async fn create_tool(
        &self,
        admin: &AuthenticatedIdentity,
        tool: NewTool,
    ) -> Result<tools::Model, AuthError> {
        if !admin.is_admin() {
            return Err(AuthError::PermissionDenied);
        }

        if tool.name.trim().is_empty() {
            return Err(AuthError::Validation("Tool name is required".to_string()));
        }

        if self.store.tools().get_by_name(&tool.name).await?.is_some() {
            return Err(AuthError::DuplicateIdentity("Tool name".to_string()));
        }

        Ok(self.store.tools().create(tool).await?)
    }

    async fn ensure_user(&self, user_id: i32) -> Result<crate::entities::users::Model, AuthError> {
        self.store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User".to_string()))
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, AuthError> {
    raw.parse()
        .map_err(|e: crate::domain::UnknownRole| AuthError::Internal(e.to_string()))
}
