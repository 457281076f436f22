//! Contains the provider CLI.

use crate::{
    flags::{ArchiveArgs, ConsensusArgs, MetricsArgs, MonitorArgs, RpcArgs},
    provider::Provider,
    telemetry,
};
use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The payout data provider CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (0-2)
    #[arg(long, short, action = ArgAction::Count)]
    pub v: u8,
    /// Archive database arguments.
    #[command(flatten)]
    pub archive: ArchiveArgs,
    /// Fork schedule arguments.
    #[command(flatten)]
    pub consensus: ConsensusArgs,
    /// Trust monitor arguments.
    #[command(flatten)]
    pub monitor: MonitorArgs,
    /// RPC server arguments.
    #[command(flatten)]
    pub rpc: RpcArgs,
    /// Prometheus arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        telemetry::init_tracing_subscriber(self.v)?;

        let provider = self.provider()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to build tokio runtime")?;
        runtime.block_on(self.start(provider))
    }

    /// Validates every argument into a [`Provider`] before anything is started.
    pub fn provider(&self) -> Result<Provider> {
        Ok(Provider {
            archive_url: self.archive.url.clone(),
            max_connections: self.archive.max_connections,
            schedule: self.consensus.epoch_schedule()?,
            check_nodes: self.monitor.check_nodes.clone(),
            monitor: self.monitor.monitor_config(),
            trust_bootstrap: self.monitor.trust_archive_database_height,
            rpc_socket: self.rpc.socket(),
        })
    }

    async fn start(self, provider: Provider) -> Result<()> {
        if self.metrics.enabled {
            telemetry::init_prometheus_server(self.metrics.addr, self.metrics.port)?;
        }

        let cancel_token = CancellationToken::new();
        let shutdown = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(target: "provider", "Received ctrl-c, shutting down");
            }
            shutdown.cancel();
        });

        provider.start(cancel_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpp_consensus::Fork;

    #[test]
    fn test_provider_from_args() {
        let cli = Cli::try_parse_from([
            "mpp-provider",
            "-vv",
            "--archive.url",
            "postgres://archive@localhost:5432/archive",
            "--fork1-start-slot",
            "564480",
            "--check-nodes",
            "http://localhost:3085/graphql",
            "--rpc.port",
            "9000",
        ])
        .unwrap();
        assert_eq!(cli.v, 2);

        let provider = cli.provider().unwrap();
        assert_eq!(provider.rpc_socket.port(), 9000);
        assert_eq!(provider.check_nodes.len(), 1);
        assert!(provider.trust_bootstrap);
        assert!(provider.schedule.forks().is_activated(Fork::Berkeley));
    }

    #[test]
    fn test_invalid_schedule_fails_before_start() {
        let cli = Cli::try_parse_from([
            "mpp-provider",
            "--archive.url",
            "postgres://archive@localhost:5432/archive",
            "--fork1-start-slot",
            "564480",
            "--slots-per-epoch",
            "7000",
        ])
        .unwrap();
        assert!(cli.provider().is_err());
    }

    #[test]
    fn test_archive_url_required() {
        assert!(Cli::try_parse_from(["mpp-provider", "--fork1-start-slot", "564480"]).is_err());
    }
}
