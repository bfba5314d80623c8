//! rr-proxy: round-robin HTTP load balancer.
//!
//! Startup order: config → logging → balancer → metrics → listener → serve.
//! Any startup error is printed and the process exits non-zero before the
//! listener is bound.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use rr_proxy::config::{read_config, validate_config, ConfigError, ProxyConfig};
use rr_proxy::lifecycle::{wait_for_signal, Shutdown};
use rr_proxy::observability::{logging, metrics};
use rr_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "rr-proxy", version, about = "Round-robin HTTP load balancer")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream base URL; repeat to build the pool in order.
    #[arg(short = 'u', long = "upstream")]
    upstreams: Vec<String>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Merge defaults, the config file and CLI flags, then validate.
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if !self.upstreams.is_empty() {
            config.upstreams = self.upstreams;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = cli.into_config()?;

    logging::init(&config.observability.log_level);
    tracing::info!(
        upstreams = ?config.upstreams,
        port = config.listener.port,
        cors = config.cors.enabled,
        "Configuration loaded"
    );

    let server = HttpServer::new(config.clone())?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Serving requests");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
