mod db_commands;
mod init_commands;

use {
    agentdesk_config::AgentdeskConfig,
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "agentdesk", about = "agentdesk: first-run setup and system gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Custom config directory (overrides the default user config dir).
    #[arg(long, global = true, env = "AGENTDESK_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "AGENTDESK_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Create the default company and administrator non-interactively.
    Init(init_commands::InitArgs),
    /// Report whether the system is initialized.
    Check {
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check that an administrator exists, is active and has the given password.
    Verify {
        #[arg(long)]
        username: Option<String>,
        #[arg(long, env = "AGENTDESK_VERIFY_PASSWORD")]
        password: Option<String>,
    },
    /// Delete every administrator and its data, then recreate the default one.
    ReinitAdmin {
        /// Confirm the destructive operation.
        #[arg(long)]
        yes: bool,
    },
    /// Database management (migrate, reset).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
}

/// Initialise tracing: `RUST_LOG` wins over `--log-level`.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Apply directory overrides, load config and make sure the data dir exists.
fn load_config(cli: &Cli) -> anyhow::Result<AgentdeskConfig> {
    if let Some(ref dir) = cli.config_dir {
        agentdesk_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        agentdesk_config::set_data_dir(dir.clone());
    }

    let mut config = agentdesk_config::discover_and_load();
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    let data_dir = agentdesk_config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "agentdesk starting");

    let config = load_config(&cli)?;

    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => agentdesk_gateway::server::start_gateway(&config).await,
        Some(Commands::Init(args)) => init_commands::quick_init(&config, args).await,
        Some(Commands::Check { json }) => init_commands::check(&config, json).await,
        Some(Commands::Verify { username, password }) => {
            init_commands::verify(&config, username, password).await
        },
        Some(Commands::ReinitAdmin { yes }) => init_commands::reinit_admin(&config, yes).await,
        Some(Commands::Db { action }) => db_commands::handle_db(&config, action).await,
    }
}
