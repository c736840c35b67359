// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Lightwatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lightwatch_monitor::{
    Monitor, MonitorConfig, MonitorSettings, RetryPolicy, StateStore, SystemClock,
    notifier_from_config, status_source_from_config, wait_for_shutdown,
};

#[derive(Parser)]
#[command(name = "lightwatch")]
#[command(about = "Posts power outage alerts for a monitored device", long_about = None)]
struct Cli {
    /// TOML config file; without it settings come from environment variables
    #[arg(short, long)]
    config: Option<String>,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lightwatch_monitor=info,lightwatch=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            MonitorConfig::from_file(path)?
        }
        None => {
            info!("Loading configuration from environment");
            MonitorConfig::from_env()?
        }
    };

    let store = Arc::new(
        StateStore::open(&config.database.path)
            .with_context(|| format!("Failed to open state store {}", config.database.path))?,
    );
    info!(path = %config.database.path, "State store opened");

    let source = status_source_from_config(&config).context("Failed to set up status source")?;
    let notifier = notifier_from_config(&config).context("Failed to set up notifier")?;
    let settings = MonitorSettings::from_config(&config)?;

    let monitor = Monitor::new(source, store, notifier, settings, Arc::new(SystemClock))
        .with_retry_policy(RetryPolicy::from_settings(&config));

    if cli.once {
        let outcome = monitor.run_once().await?;
        info!(?outcome, "Check finished");
        return Ok(());
    }

    tokio::select! {
        () = monitor.run() => {}
        () = wait_for_shutdown(tokio::signal::ctrl_c()) => info!("Shutting down"),
    }

    Ok(())
}
