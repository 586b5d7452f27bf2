use {
    agentdesk_bootstrap::{FileFlagStore, FlagStore},
    agentdesk_config::AgentdeskConfig,
    agentdesk_store::SqliteStore,
    anyhow::bail,
    clap::Subcommand,
    std::path::PathBuf,
};

#[derive(Subcommand)]
pub enum DbAction {
    /// Run all pending database migrations.
    Migrate,
    /// Delete the database file(s) and the initialization flag.
    Reset {
        /// Confirm the destructive operation.
        #[arg(long)]
        yes: bool,
    },
}

pub async fn handle_db(config: &AgentdeskConfig, action: DbAction) -> anyhow::Result<()> {
    match action {
        DbAction::Migrate => run_migrations(config).await,
        DbAction::Reset { yes } => reset_database(config, yes).await,
    }
}

/// Path of the SQLite database behind `url`, or `None` for in-memory and
/// non-file URLs.
fn sqlite_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Delete the database (with its WAL and SHM files) and the flag record.
async fn reset_database(config: &AgentdeskConfig, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to delete the database without --yes");
    }

    let mut targets = Vec::new();
    match sqlite_path(&config.database.resolved_url()) {
        Some(db) => {
            for suffix in ["", "-wal", "-shm"] {
                let mut name = db.clone().into_os_string();
                name.push(suffix);
                targets.push(PathBuf::from(name));
            }
        },
        None => eprintln!("Database URL does not point at a file; skipping database files."),
    }

    let mut deleted = false;
    for path in targets {
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
            println!("Deleted: {}", path.display());
            deleted = true;
        }
    }

    let flags = FileFlagStore::new(config.bootstrap.resolved_flag_file());
    if flags.path().exists() {
        flags.clear().await?;
        println!("Deleted: {}", flags.path().display());
        deleted = true;
    }

    if deleted {
        println!("Reset complete. Run `agentdesk db migrate` or `agentdesk init` to start over.");
    } else {
        println!("Nothing to delete.");
    }
    Ok(())
}

async fn run_migrations(config: &AgentdeskConfig) -> anyhow::Result<()> {
    let url = config.database.resolved_url();
    if let Some(parent) = sqlite_path(&url).as_deref().and_then(|p| p.parent())
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    println!("Running migrations...");
    // Connecting applies every pending migration.
    let store = SqliteStore::connect(&url, 1).await?;
    store.close().await;
    println!("All migrations complete.");
    Ok(())
}
