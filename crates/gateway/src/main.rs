//! HDFS Gateway
//!
//! REST service in front of the `hdfs` command-line client.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gateway::config::{default_config_path, Config};
use gateway::hdfs::{HdfsCli, RemoteFs};
use gateway::remote_path::list_target;
use gateway::GatewayServer;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name prefix inside `server.log_dir`.
const LOG_FILE_PREFIX: &str = "hdfs-gateway.log";

/// HDFS Gateway - REST service over the hdfs command-line client.
#[derive(Parser, Debug)]
#[command(name = "hdfs-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server until SIGINT or SIGTERM
    Serve {
        /// Listen address (overrides server.bind_addr)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Remote base directory (overrides hdfs.base_dir)
        #[arg(long, value_name = "DIR")]
        base_dir: Option<String>,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Validate the configuration and probe the remote filesystem
    Check,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the resolved configuration as TOML
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    let _log_guard = init_tracing(&config, cli.verbose)?;
    tracing::debug!("Using config file: {:?}", config_path);

    match cli.command {
        Commands::Serve { bind, base_dir } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            if let Some(base_dir) = base_dir {
                config.hdfs.base_dir = base_dir;
            }
            config.validate()?;
            serve(config).await?;
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
        Commands::Check => {
            config.validate()?;
            check(&config).await?;
        }
    }

    Ok(())
}

/// Build the directive for the log filter. `RUST_LOG` takes precedence when
/// set.
fn filter_directive(level: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else {
        level.to_lowercase()
    }
}

/// Install the global subscriber. Logs go to stderr, and also to a
/// daily-rolling file when `server.log_dir` is set. The returned guard must
/// be held until exit so buffered file output is flushed.
fn init_tracing(config: &Config, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.server.log_level, verbose)));

    let (file_layer, guard) = match &config.server.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Run the server until a shutdown signal arrives.
async fn serve(config: Config) -> anyhow::Result<()> {
    let server = GatewayServer::new(config)?;
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                token.cancel();
            }
            Err(e) => tracing::error!("{:#}", e),
        }
    });

    server.run(shutdown).await?;
    Ok(())
}

/// Probe the base directory through the `hdfs` client.
async fn check(config: &Config) -> anyhow::Result<()> {
    let hdfs = HdfsCli::from_config(&config.hdfs);
    let base = list_target(&config.hdfs.base_dir, "");

    let exists = hdfs
        .exists(&base)
        .await
        .with_context(|| format!("Failed to run {}", config.hdfs.hdfs_bin))?;
    if !exists {
        anyhow::bail!("Base directory does not exist: {}", base);
    }

    println!("Configuration OK");
    println!("  hdfs:     {}", config.hdfs.hdfs_bin);
    println!("  base_dir: {}", base);
    println!("  listen:   {}", config.server.bind_addr);
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
    Ok(())
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")
}
