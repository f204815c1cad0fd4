//! Kafka-Pixy service binary.
//!
//! # Architecture Overview
//!
//! ```text
//!      HTTP clients                         ┌─────────────────────────────┐
//!   ───────────────▶ unix socket listener ─▶│                             │
//!   ───────────────▶ tcp listener (opt.)  ─▶│  Kafka client (brokers...)  │──▶ Kafka
//!                          ▲                └──────────────▲──────────────┘
//!                          │ start / stop / crash          │ start / stop / wait
//!                          └────────────── supervisor ─────┘
//! ```
//!
//! Shutdown order: listeners first, Kafka client last.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use kafka_pixy::config::loader::load_config;
use kafka_pixy::config::ServiceConfig;
use kafka_pixy::lifecycle::signals::wait_for_signal;
use kafka_pixy::lifecycle::{DefaultFactory, Service};
use kafka_pixy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "kafka-pixy")]
#[command(about = "HTTP API gateway in front of a Kafka cluster", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unix socket path for the HTTP API.
    #[arg(long)]
    unix_addr: Option<String>,

    /// TCP address for the HTTP API; empty disables it.
    #[arg(long)]
    tcp_addr: Option<String>,

    /// Kafka broker address, host:port. Repeat for several brokers.
    #[arg(long = "broker")]
    brokers: Vec<String>,

    /// Log level override.
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(addr) = &self.unix_addr {
            config.unix_addr = addr.clone();
        }
        if let Some(addr) = &self.tcp_addr {
            config.tcp_addr = addr.clone();
        }
        if !self.brokers.is_empty() {
            config.broker_addrs = self.brokers.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    cli.apply(&mut config);

    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "kafka-pixy starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let factory = DefaultFactory::new(config.backend.clone());
    let service = Service::spawn(&config, &factory)?;

    let requested = tokio::select! {
        signal = wait_for_signal() => {
            let signal = signal?;
            tracing::info!(signal = %signal, "Shutdown signal received");
            service.stop();
            true
        }
        _ = service.wait_for_stop() => {
            tracing::error!("Service stopped without a shutdown request");
            false
        }
    };

    tokio::select! {
        _ = service.wait_for_stop() => {}
        signal = wait_for_signal() => {
            if let Ok(signal) = signal {
                tracing::warn!(signal = %signal, "Second signal received, forcing exit");
            }
            std::process::exit(1);
        }
    }

    if !requested {
        // A listener crashed; let the process manager see a failure.
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
