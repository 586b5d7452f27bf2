use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    error::Context,
    schema::AgentdeskConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "agentdesk.toml",
    "agentdesk.yaml",
    "agentdesk.yml",
    "agentdesk.json",
];

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);
static DATA_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Override the user-global config directory (from `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.lock() {
        *guard = Some(dir);
    }
}

/// Override the data directory (from `--data-dir`).
pub fn set_data_dir(dir: PathBuf) {
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.lock() {
        *guard = Some(dir);
    }
}

pub fn clear_data_dir() {
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.lock() {
        *guard = None;
    }
}

/// Returns the config directory: the override if set, else `~/.config/agentdesk/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(guard) = CONFIG_DIR_OVERRIDE.lock()
        && let Some(dir) = guard.as_ref()
    {
        return Some(dir.clone());
    }
    directories::ProjectDirs::from("", "", "agentdesk").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding the database and the flag record.
///
/// Falls back to `./data` when no platform data dir can be determined.
pub fn data_dir() -> PathBuf {
    if let Ok(guard) = DATA_DIR_OVERRIDE.lock()
        && let Some(dir) = guard.as_ref()
    {
        return dir.clone();
    }
    directories::ProjectDirs::from("", "", "agentdesk")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<AgentdeskConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./agentdesk.{toml,yaml,yml,json}` (deployment-local)
/// 2. `<config_dir>/agentdesk.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `AgentdeskConfig::default()` if no file is found or it
/// fails to parse.
pub fn discover_and_load() -> AgentdeskConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                AgentdeskConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            AgentdeskConfig::default()
        },
    };
    if let Err(e) = apply_env_overrides(&mut config, |name| std::env::var(name).ok()) {
        warn!(error = %e, "ignoring invalid environment override");
    }
    config
}

/// Apply `AGENTDESK_*` overrides on top of a loaded config.
pub fn apply_env_overrides(
    config: &mut AgentdeskConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(url) = lookup("AGENTDESK_DATABASE_URL") {
        config.database.url = Some(url);
    }
    if let Some(bind) = lookup("AGENTDESK_BIND") {
        config.server.bind = bind;
    }
    if let Some(path) = lookup("AGENTDESK_FLAG_FILE") {
        config.bootstrap.flag_file = Some(PathBuf::from(path));
    }
    if let Some(name) = lookup("AGENTDESK_COMPANY_NAME") {
        config.bootstrap.company_name = name;
    }
    if let Some(password) = lookup("AGENTDESK_REINIT_PASSWORD") {
        config.bootstrap.reinit_password = Secret::new(password);
    }
    // Parsed last so a bad port never hides the overrides above.
    if let Some(port) = lookup("AGENTDESK_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("AGENTDESK_PORT={port}"))?;
    }
    Ok(())
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<AgentdeskConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentdesk.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8080\n\n[bootstrap]\ncompany_name = \"Acme\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.bootstrap.company_name, "Acme");
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentdesk.yaml");
        std::fs::write(&path, "database:\n  url: \"sqlite::memory:\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.database.url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agentdesk.ini");
        std::fs::write(&path, "port=1").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Path::new("/nonexistent/agentdesk.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = AgentdeskConfig::default();
        apply_env_overrides(&mut cfg, |name| match name {
            "AGENTDESK_DATABASE_URL" => Some("sqlite:/tmp/x.db".into()),
            "AGENTDESK_PORT" => Some("9090".into()),
            "AGENTDESK_FLAG_FILE" => Some("/tmp/flag.json".into()),
            "AGENTDESK_REINIT_PASSWORD" => Some("s3cret!".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(cfg.database.url.as_deref(), Some("sqlite:/tmp/x.db"));
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(
            cfg.bootstrap.flag_file.as_deref(),
            Some(Path::new("/tmp/flag.json"))
        );
        assert_eq!(cfg.bootstrap.reinit_password.expose_secret(), "s3cret!");
    }

    #[test]
    fn bad_port_override_is_an_error() {
        let mut cfg = AgentdeskConfig::default();
        let err = apply_env_overrides(&mut cfg, |name| {
            (name == "AGENTDESK_PORT").then(|| "not-a-port".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("AGENTDESK_PORT"), "{err}");
    }

    #[test]
    fn bad_port_does_not_skip_other_overrides() {
        let mut cfg = AgentdeskConfig::default();
        let result = apply_env_overrides(&mut cfg, |name| match name {
            "AGENTDESK_PORT" => Some("99999".into()),
            "AGENTDESK_FLAG_FILE" => Some("/tmp/flag.json".into()),
            "AGENTDESK_COMPANY_NAME" => Some("Acme".into()),
            "AGENTDESK_REINIT_PASSWORD" => Some("s3cret!".into()),
            _ => None,
        });

        assert!(result.is_err());
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.bootstrap.company_name, "Acme");
        assert_eq!(
            cfg.bootstrap.flag_file.as_deref(),
            Some(Path::new("/tmp/flag.json"))
        );
        assert_eq!(cfg.bootstrap.reinit_password.expose_secret(), "s3cret!");
    }

    #[test]
    fn data_dir_override_wins() {
        set_data_dir(PathBuf::from("/srv/agentdesk"));
        assert_eq!(data_dir(), PathBuf::from("/srv/agentdesk"));
        clear_data_dir();
        assert_ne!(data_dir(), PathBuf::from("/srv/agentdesk"));
    }
}
