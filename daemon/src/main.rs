//! QuorumDB daemon entry point.
//!
//! Startup order matters: load config, initialise logging, open storage,
//! run the pre-commit recovery protocol, and only then expose the
//! application to the consensus-engine transport. Any fatal error
//! terminates the process; replicas must not keep running in a state the
//! rest of the network cannot reproduce.

use clap::Parser;
use quorumdb_core::{
    init_logging, rollback_unfinished_block, App, AppConfig, BasicValidator, Event, LogFormat,
    RecoveryOutcome,
};
use quorumdb_store_memory::MemoryStore;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "quorumdb", about = "QuorumDB state-machine daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "QUORUMDB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "QUORUMDB_LOG_FORMAT")]
    log_format: Option<String>,

    /// Address the consensus-engine transport binds to.
    #[arg(long, env = "QUORUMDB_CONSENSUS_LISTEN")]
    consensus_listen: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match AppConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(listen) = cli.consensus_listen {
        config.consensus_listen = listen;
    }

    init_logging(LogFormat::from_name(&config.log_format), &config.log_level);

    if let Err(err) = run(config).await {
        error!(%err, "fatal error, exiting");
        process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), quorumdb_core::AppError> {
    let store = MemoryStore::new();

    match rollback_unfinished_block(&store)? {
        RecoveryOutcome::NothingToRecover => {
            info!("no pre-commit checkpoint, clean start");
        }
        RecoveryOutcome::AlreadyCommitted => {
            info!("pre-commit checkpoint is stale, nothing to roll back");
        }
        RecoveryOutcome::RolledBack { height } => {
            info!(height, "rolled back an interrupted block, awaiting resend");
        }
    }

    let mut app = App::new(store, BasicValidator)?;

    // Drain block-committed events off the committing thread; slow
    // subscribers must never stall Commit.
    let events = app.events().subscribe_channel();
    std::thread::spawn(move || {
        for event in events {
            let Event::BlockCommitted {
                height,
                transactions,
            } = event;
            info!(height, txs = transactions.len(), "block committed");
        }
    });

    info!(
        listen = %config.consensus_listen,
        "ready; waiting for the consensus engine"
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "cannot listen for shutdown signal");
        process::exit(1);
    }
    info!("shutdown signal received, stopping");
    Ok(())
}
