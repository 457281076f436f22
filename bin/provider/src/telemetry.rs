//! Tracing and Prometheus setup.

use anyhow::{Context as _, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Maps the count of `-v` flags to the default log level.
pub const fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives take precedence over the level picked by `verbosity`.
pub fn init_tracing_subscriber(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level(verbosity).into())
        .from_env()
        .context("Invalid RUST_LOG directives")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("Failed to install tracing subscriber")
}

/// Starts a Prometheus metrics server on the given address.
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> Result<()> {
    let socket = SocketAddr::new(addr, port);
    PrometheusBuilder::new()
        .with_http_listener(socket)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(target: "prometheus", "Serving metrics at: http://{socket}");
    Ok(())
}
