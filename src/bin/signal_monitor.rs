// src/bin/signal_monitor.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use structure_signals::{
    config::{Config, ConfigSource},
    notifier::{LogNotifier, Notifier, TelegramNotifier},
    provider::{AlphaVantageProvider, DataProvider},
    setup_logging, status, AnalysisError, SignalLog, SignalRunner,
};

// CLI Arguments
#[derive(Parser)]
#[clap(author, version, about = "Multi-timeframe structure signal monitor")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run cycles on the configured interval and serve the status endpoint
    Run {
        /// Path to configuration file
        #[clap(short, long, default_value = "config/monitor.toml")]
        config: PathBuf,
    },
    /// Run a single cycle and print the result
    Once {
        /// Path to configuration file
        #[clap(short, long, default_value = "config/monitor.toml")]
        config: PathBuf,
    },
}

/// Loads the config, installs logging at its level, then reports where the
/// config came from so the notice reaches the log.
fn load_config(path: &Path) -> Result<Config> {
    let (config, source) = Config::load_with_source(path)?;
    setup_logging(&config.general.log_level);

    match source {
        ConfigSource::File(file) => info!("Loaded config from {}", file.display()),
        ConfigSource::Defaults => warn!("Config file not found at {}, using defaults", path.display()),
    }
    Ok(config)
}

fn build_runner(config: &Config) -> Result<(SignalRunner, Arc<SignalLog>)> {
    if config.provider.api_key.is_empty() {
        warn!("ALPHA_VANTAGE_API_KEY is not set, requests will be rejected");
    }
    let provider: Arc<dyn DataProvider> = Arc::new(AlphaVantageProvider::new(config.provider.clone())?);

    let notifier: Arc<dyn Notifier> = match TelegramNotifier::from_config(&config.telegram)? {
        Some(telegram) => Arc::new(telegram),
        None => {
            info!("Telegram disabled");
            Arc::new(LogNotifier)
        }
    };

    let log = Arc::new(SignalLog::new(&config.general.signal_log)?);
    info!("Signal log: {}", log.path().display());
    let runner = SignalRunner::new(config, provider, notifier, log.clone());
    Ok((runner, log))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Run { config } => {
            let config = load_config(&config)?;

            let (runner, log) = build_runner(&config)?;

            if config.status.enabled {
                let bind = config.status.bind.clone();
                tokio::spawn(async move {
                    if let Err(e) = status::start_server(&bind, log).await {
                        error!("Status server stopped: {:#}", e);
                    }
                });
            }

            info!("Symbol: {}", runner.symbol());
            runner.run_forever().await;
        }
        Command::Once { config } => {
            let config = load_config(&config)?;

            let (runner, _) = build_runner(&config)?;

            match runner.run_cycle().await {
                Ok(result) => {
                    let json = serde_json::to_string_pretty(&result).context("Failed to serialize signal")?;
                    println!("{}", json);
                }
                Err(AnalysisError::IncompleteCycle { missing }) => {
                    let missing: Vec<String> = missing.iter().map(|tf| tf.to_string()).collect();
                    println!("No signal this cycle, missing {}", missing.join(", "));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
