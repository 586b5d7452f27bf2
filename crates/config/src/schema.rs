//! Config schema types (server, database, bootstrap).

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result, loader::data_dir};

/// Lowest bcrypt cost accepted for stored password hashes.
pub const MIN_PASSWORD_COST: u32 = 10;
/// Highest cost bcrypt supports.
pub const MAX_PASSWORD_COST: u32 = 31;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentdeskConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bootstrap: BootstrapConfig,
}

impl AgentdeskConfig {
    /// Reject values that would weaken or break bootstrap.
    pub fn validate(&self) -> Result<()> {
        let cost = self.bootstrap.password_cost;
        if !(MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(&cost) {
            return Err(Error::invalid(format!(
                "bootstrap.password_cost must be between {MIN_PASSWORD_COST} and {MAX_PASSWORD_COST}, got {cost}"
            )));
        }
        if self.bootstrap.company_name.trim().is_empty() {
            return Err(Error::invalid("bootstrap.company_name must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(Error::invalid("database.max_connections must be at least 1"));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Relational store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL. When unset, `agentdesk.db` in the data dir is used.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// The configured URL, or the default on-disk SQLite database.
    pub fn resolved_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!("sqlite:{}?mode=rwc", data_dir().join("agentdesk.db").display())
        })
    }
}

/// First-run initialization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Name of the default tenant created on first run.
    pub company_name: String,
    /// Location of the initialization flag record. Defaults to
    /// `.system-initialized.json` in the data dir.
    pub flag_file: Option<PathBuf>,
    /// bcrypt cost used when hashing the administrator password.
    pub password_cost: u32,
    /// Password given to the administrator recreated by force re-init.
    #[serde(serialize_with = "serialize_secret")]
    pub reinit_password: Secret<String>,
    /// Administrator created by the non-interactive `init` command.
    pub default_admin: DefaultAdminConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            company_name: "Default Company".into(),
            flag_file: None,
            password_cost: 12,
            reinit_password: Secret::new("admin123".into()),
            default_admin: DefaultAdminConfig::default(),
        }
    }
}

impl BootstrapConfig {
    pub fn resolved_flag_file(&self) -> PathBuf {
        self.flag_file
            .clone()
            .unwrap_or_else(|| data_dir().join(".system-initialized.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultAdminConfig {
    pub username: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    pub display_name: String,
    pub position: String,
}

impl Default for DefaultAdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: Secret::new("admin123".into()),
            display_name: "Administrator".into(),
            position: "System Administrator".into(),
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
