use clap::Args;
use std::net::{IpAddr, Ipv4Addr};

/// Prometheus exporter arguments.
#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics.
    #[arg(long = "metrics.enabled", env = "METRICS_ENABLED")]
    pub enabled: bool,

    /// IP address for the metrics server to listen on.
    #[arg(long = "metrics.addr", env = "METRICS_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub addr: IpAddr,

    /// Port for the metrics server to listen on.
    #[arg(long = "metrics.port", env = "METRICS_PORT", default_value_t = 9090)]
    pub port: u16,
}
