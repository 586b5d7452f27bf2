//! Configuration loading, env substitution, and environment overrides.
//!
//! Config files: `agentdesk.toml`, `agentdesk.yaml`, or `agentdesk.json`
//! Searched in `./` then `~/.config/agentdesk/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, clear_data_dir, config_dir, data_dir,
        discover_and_load, load_config, set_config_dir, set_data_dir,
    },
    schema::{
        AgentdeskConfig, BootstrapConfig, DatabaseConfig, DefaultAdminConfig, ServerConfig,
    },
};
