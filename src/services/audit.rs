//! Append-only activity trail and its role-scoped queries.

use std::sync::Arc;

use tracing::error;

use crate::clock::Clock;
use crate::db::{ActivityFilter, ActivityRow, NewActivity, Store};
use crate::domain::access::{AuditScope, satisfies};
use crate::domain::{AuthenticatedIdentity, Role};
use crate::services::auth_service::{AuthError, RequestOrigin};

pub const DEFAULT_RECENT_LIMIT: u64 = 10;
pub const MAX_RECENT_LIMIT: u64 = 100;

pub struct AuditService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl AuditService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Best-effort append. A failed write is reported, never returned.
    pub async fn log(
        &self,
        actor_id: i32,
        action: &str,
        details: Option<String>,
        origin: Option<&RequestOrigin>,
    ) {
        let mut entry = NewActivity::new(actor_id, action, self.clock.now())
            .origin(origin.and_then(|o| o.ip_address.clone()));
        entry.details = details;

        if let Err(e) = self.store.activity().append(&entry).await {
            metrics::counter!("audit_write_failures_total", "action" => action.to_string())
                .increment(1);
            error!(
                event = "audit_write_failed",
                user_id = actor_id,
                action,
                error = %e,
                "Failed to write activity log entry"
            );
        }
    }

    /// Newest first, visible to `viewer` per role. `limit` is clamped to
    /// 1..=100.
    pub async fn recent(
        &self,
        viewer: &AuthenticatedIdentity,
        limit: u64,
    ) -> Result<Vec<ActivityRow>, AuthError> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        Ok(self
            .store
            .activity()
            .recent(AuditScope::for_identity(viewer), limit)
            .await?)
    }

    /// Scoped and filtered view. Only Admins and Managers may use it.
    pub async fn filter(
        &self,
        viewer: &AuthenticatedIdentity,
        filter: &ActivityFilter,
    ) -> Result<Vec<ActivityRow>, AuthError> {
        if !satisfies(viewer.role, Role::Manager) {
            return Err(AuthError::PermissionDenied);
        }

        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date)
            && start > end
        {
            return Err(AuthError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }

        Ok(self
            .store
            .activity()
            .filtered(AuditScope::for_identity(viewer), filter, None)
            .await?)
    }

    /// Distinct action names within the viewer's scope. Same gate as `filter`.
    pub async fn actions(&self, viewer: &AuthenticatedIdentity) -> Result<Vec<String>, AuthError> {
        if !satisfies(viewer.role, Role::Manager) {
            return Err(AuthError::PermissionDenied);
        }

        Ok(self
            .store
            .activity()
            .distinct_actions(AuditScope::for_identity(viewer))
            .await?)
    }
}
