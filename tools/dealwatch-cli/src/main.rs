//! dealwatch CLI - run the deal-discovery pipeline.
//!
//! Commands:
//! - `dealwatch run` - continuous discovery cycles until ctrl-c
//! - `dealwatch once` - a single discovery cycle
//! - `dealwatch check-config` - validate and print the effective settings

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dealwatch_core::destination::{Destination, DestinationKind};
use dealwatch_engine::prelude::*;
use dealwatch_scrape::ReqwestTransport;
use output::ConsoleTransport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// dealwatch - discover and broadcast catalog deals
#[derive(Parser)]
#[command(name = "dealwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run continuous discovery cycles until interrupted
    Run,

    /// Run a single discovery cycle and exit
    Once,

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() {
    // RUST_LOG controls verbosity
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => output::fail(&e),
    };

    let result = match cli.command {
        Commands::Run => run(config, true).await,
        Commands::Once => run(config, false).await,
        Commands::CheckConfig => check_config(&config),
    };
    if let Err(e) = result {
        output::fail(&e);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

async fn run(config: Config, continuous: bool) -> Result<()> {
    let http = ReqwestTransport::new(Duration::from_secs(config.scraping.timeout_secs))
        .context("building HTTP client")?;

    // in-memory store and console transport; a deployment swaps in its
    // persistence and messaging backends here
    let store = Arc::new(MemoryStore::new());
    store.add_destination(Destination::new(
        "console",
        "Terminal",
        DestinationKind::Channel,
    ));

    let engine = DealsEngine::new(
        config,
        http,
        store,
        Arc::new(ConsoleTransport::new()),
        Arc::new(SystemClock),
    );
    engine.initialize().await.context("engine initialization")?;

    if continuous {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = stop_tx.send(true);
        });
        engine.run(stop_rx).await;
    } else {
        let metrics = engine.run_once().await;
        output::print_cycle_summary(&metrics);
    }
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("rendering configuration")?;
    println!("{rendered}");
    Ok(())
}
