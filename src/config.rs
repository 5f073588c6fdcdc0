use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::policy::MIN_PASSWORD_LENGTH;

const MAX_EXPIRY_DAYS: i64 = 3650;
const MAX_RESET_TOKEN_TTL_HOURS: i64 = 24 * 30;
const MAX_SESSION_INACTIVITY_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub bootstrap: BootstrapConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/dirhub.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session lifetime without activity, unless the login asked to be remembered.
    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    pub password_policy: PasswordPolicyConfig,

    /// Return freshly issued reset tokens in API responses.
    /// Only meant for deployments without outbound mail.
    pub expose_reset_tokens: bool,

    /// Six-field cron expression for purging used or expired reset tokens.
    pub token_cleanup_cron: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            password_policy: PasswordPolicyConfig::default(),
            expose_reset_tokens: false,
            token_cleanup_cron: "0 0 3 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,

    /// Days after the last change before a password must be rotated.
    pub expiry_days: i64,

    /// How many of the newest history entries block reuse.
    pub history_depth: u64,

    pub reset_token_ttl_hours: i64,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            expiry_days: 90,
            history_depth: 5,
            reset_token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_username: String,

    pub admin_email: String,

    pub admin_full_name: String,

    /// Must satisfy the password policy. Change it after first login.
    pub admin_password: String,

    /// Also create a "manager" and a "staff" account on an empty database.
    pub seed_demo_users: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_email: "admin@directoryhub.com".to_string(),
            admin_full_name: "Admin User".to_string(),
            admin_password: "ChangeMe123!".to_string(),
            seed_demo_users: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "dirhub".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dirhub").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".dirhub").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let policy = &self.security.password_policy;

        if policy.min_length < MIN_PASSWORD_LENGTH {
            anyhow::bail!("Password min_length cannot be below {MIN_PASSWORD_LENGTH}");
        }

        if policy.history_depth == 0 {
            anyhow::bail!("Password history_depth must be > 0");
        }

        if !(1..=MAX_EXPIRY_DAYS).contains(&policy.expiry_days) {
            anyhow::bail!("Password expiry_days must be between 1 and {MAX_EXPIRY_DAYS}");
        }

        if !(1..=MAX_RESET_TOKEN_TTL_HOURS).contains(&policy.reset_token_ttl_hours) {
            anyhow::bail!(
                "Reset token TTL must be between 1 and {MAX_RESET_TOKEN_TTL_HOURS} hours"
            );
        }

        if !(1..=MAX_SESSION_INACTIVITY_MINUTES).contains(&self.server.session_inactivity_minutes)
        {
            anyhow::bail!(
                "Session inactivity timeout must be between 1 and {MAX_SESSION_INACTIVITY_MINUTES} minutes"
            );
        }

        let bootstrap = &self.bootstrap;
        if bootstrap.admin_username.trim().is_empty()
            || bootstrap.admin_email.trim().is_empty()
            || bootstrap.admin_full_name.trim().is_empty()
        {
            anyhow::bail!("Bootstrap admin username, email and full name cannot be empty");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}
