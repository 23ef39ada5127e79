//! # turnwatch-cli
//!
//! Binary entry point for Turnwatch.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Logging and configuration setup
//! - The long-running `run` loop that restores watchers and reads commands
//!   from stdin
//! - One-shot helpers: `games` to inspect persisted state and `check` to test
//!   the page pattern against a live game

mod http_oracle;
mod notifier;
mod router;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use turnwatch_core::{Registry, StateStore, TurnWatch, TurnwatchConfig, WatcherContext, WatcherSupervisor};
use turnwatch_proto::{CallerId, ChannelRef, TurnOracle};

use crate::http_oracle::HttpOracle;
use crate::notifier::ChannelNotifier;
use crate::router::{CommandContext, dispatch};

/// Turnwatch - follows turn-based games and announces who is up
#[derive(Parser, Debug)]
#[command(name = "turnwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    // ─────────────────────────────────────────────────────────────────────────
    // Global options (available for all subcommands)
    // ─────────────────────────────────────────────────────────────────────────

    /// Path to configuration file
    #[arg(short, long, default_value = "settings.yaml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Restore followed games and read commands from stdin (default)
    Run(RunArgs),

    /// Print the persisted games of a guild without starting watchers
    Games(GamesArgs),

    /// Load a game page once and print who is up
    Check(CheckArgs),
}

/// Arguments for the run subcommand.
#[derive(Parser, Debug)]
struct RunArgs {
    /// Guild console commands act on (overrides config)
    #[arg(long)]
    guild: Option<String>,

    /// Channel games followed from the console report into (overrides config)
    #[arg(long)]
    channel: Option<String>,

    /// Name console commands are issued as
    #[arg(long, default_value = "console")]
    user: String,
}

/// Arguments for the games subcommand.
#[derive(Parser, Debug)]
struct GamesArgs {
    /// Guild to list (defaults to the configured guild)
    #[arg(long)]
    guild: Option<String>,
}

/// Arguments for the check subcommand.
#[derive(Parser, Debug)]
struct CheckArgs {
    /// Game page URL
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries console messages and replies
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Run(args)) => run_command(config, args).await,
        Some(Commands::Games(args)) => games_command(&config, args),
        Some(Commands::Check(args)) => check_command(&config, args).await,
        None => {
            let args = RunArgs {
                guild: None,
                channel: None,
                user: "console".to_string(),
            };
            run_command(config, args).await
        }
    }
}

fn load_config(path: &Path) -> Result<TurnwatchConfig> {
    let config = if path.exists() {
        TurnwatchConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?
    } else {
        warn!("Config file {:?} not found, using defaults", path);
        TurnwatchConfig::default()
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_command(config: TurnwatchConfig, args: RunArgs) -> Result<()> {
    let registry = Arc::new(Registry::open(StateStore::new(&config.data_file)));
    let oracle = HttpOracle::new(&config.oracle).context("Failed to set up page oracle")?;
    let notifier = ChannelNotifier::new(&config.notifier).context("Failed to set up notifier")?;

    let ctx = WatcherContext {
        registry,
        oracle: Arc::new(oracle),
        notifier: Arc::new(notifier),
        settings: config.watcher_settings(),
    };
    let tw = TurnWatch::new(WatcherSupervisor::new(ctx)?);
    let restored = tw.restore();
    info!(watchers = restored, data_file = %config.data_file, "Turnwatch started");

    let console = CommandContext {
        guild: args.guild.unwrap_or(config.guild),
        channel: ChannelRef::new(args.channel.unwrap_or(config.channel)),
        caller: CallerId::new(args.user.clone()),
        caller_name: args.user,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if let Some(reply) = dispatch(&tw, &console, &line).await {
                        println!("{reply}");
                    }
                }
                Ok(None) => {
                    info!("stdin closed, watchers keep running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read command from stdin");
                    stdin_open = false;
                }
            },
        }
    }

    tw.shutdown().await;
    if let Err(e) = tw.registry().flush() {
        warn!(error = %e, "Final registry flush failed");
    }
    info!("Turnwatch stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => warn!("Interrupt received (SIGINT), stopping watchers..."),
        () = terminate => warn!("SIGTERM received, stopping watchers..."),
    }
}

fn games_command(config: &TurnwatchConfig, args: GamesArgs) -> Result<()> {
    let guild = args.guild.unwrap_or_else(|| config.guild.clone());
    let document = StateStore::new(&config.data_file)
        .load()
        .with_context(|| format!("Failed to read {}", config.data_file))?
        .unwrap_or_default();

    let games = document
        .tenants
        .get(&guild)
        .map(|tenant| tenant.games.values().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    if games.is_empty() {
        println!("No games currently being monitored.");
        return Ok(());
    }
    for game in games {
        let player = if game.last_player_up.is_empty() {
            "nobody known"
        } else {
            game.last_player_up.as_str()
        };
        println!(
            "{}: {} ({}) --> {} is up [{}]",
            game.id, game.friendly_name, game.url, player, game.channel
        );
    }
    Ok(())
}

async fn check_command(config: &TurnwatchConfig, args: CheckArgs) -> Result<()> {
    let oracle = HttpOracle::new(&config.oracle).context("Failed to set up page oracle")?;
    let mut session = oracle
        .open(&args.url)
        .await
        .with_context(|| format!("Failed to load {}", args.url))?;
    let read = session.check_who_is_up().await;
    session.close().await?;
    match read.player() {
        Some(player) => println!("{player} is up"),
        None => println!("No active player found ({read:?})"),
    }
    Ok(())
}
