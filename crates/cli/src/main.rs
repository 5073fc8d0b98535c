mod chat_commands;
mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    duplex_config::{ConfigManager, DuplexSettings},
    duplex_store::{FileStore, KvStore},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "duplex", about = "Duplex: two-party chat over a pair of Telegram channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/duplex/).
    #[arg(long, global = true, env = "DUPLEX_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "DUPLEX_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay credentials management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Print the persisted message history.
    History,
    /// Poll the receiver channel and print messages as they arrive.
    Watch,
    /// Relay a message to the configured channels.
    Send { message: String },
}

/// Settings and durable store shared by every command.
pub(crate) struct Context {
    pub settings: DuplexSettings,
    pub store: Arc<dyn KvStore>,
}

impl Context {
    fn new(cli: &Cli) -> Self {
        let settings = duplex_config::discover_and_load(cli.config_dir.as_deref());
        let store = FileStore::new(duplex_config::data_dir(&settings, cli.data_dir.as_deref()));
        debug!(data_dir = %store.dir().display(), "using data directory");
        Self {
            settings,
            store: Arc::new(store),
        }
    }

    /// Configuration manager with the stored configuration loaded, if any.
    pub fn config_manager(&self) -> ConfigManager {
        let mut manager = ConfigManager::new(Arc::clone(&self.store));
        manager.load(None);
        manager
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "duplex starting");

    let ctx = Context::new(&cli);
    match cli.command {
        Commands::Config { action } => config_commands::handle_config(&ctx, action),
        Commands::History => chat_commands::history(&ctx),
        Commands::Watch => chat_commands::watch(&ctx).await,
        Commands::Send { message } => chat_commands::send(&ctx, &message).await,
    }
}
