use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Store;
use crate::services::bootstrap::ensure_bootstrap_users;
use crate::services::{
    AccessService, AuditService, AuthService, CredentialService, SeaOrmAuthService,
    SeaOrmUserAdminService, UserAdminService,
};

/// Everything a request handler or CLI command needs, built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub clock: Arc<dyn Clock>,

    pub credentials: Arc<CredentialService>,

    pub access: Arc<AccessService>,

    pub audit: Arc<AuditService>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserAdminService>,

    /// Concrete handle for provisioning without an admin identity.
    pub provisioner: Arc<SeaOrmUserAdminService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    /// Same as [`SharedState::new`] with an injected time source.
    pub async fn with_clock(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let credentials = Arc::new(CredentialService::new(
            store.clone(),
            clock.clone(),
            config.security.clone(),
        ));
        let access = Arc::new(AccessService::new(store.clone(), clock.clone()));
        let audit = Arc::new(AuditService::new(store.clone(), clock.clone()));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            credentials.clone(),
            audit.clone(),
        )) as Arc<dyn AuthService>;

        let provisioner = Arc::new(SeaOrmUserAdminService::new(
            store.clone(),
            credentials.clone(),
            audit.clone(),
        ));
        let user_service = provisioner.clone() as Arc<dyn UserAdminService>;

        ensure_bootstrap_users(&store, &provisioner, &config.bootstrap).await?;

        Ok(Self {
            config: Arc::new(config),
            store,
            clock,
            credentials,
            access,
            audit,
            auth_service,
            user_service,
            provisioner,
        })
    }
}
