//! Process wiring.

use anyhow::{Context as _, Result};
use jsonrpsee::{RpcModule, server::Server};
use mpp_archive::PgArchive;
use mpp_consensus::EpochSchedule;
use mpp_core::{
    ArchiveEngine, GraphQlNodeClient, MonitorConfig, NodeHeightSource, TrustGate,
    TrustStateMonitor, trust_state,
};
use mpp_rpc::{ArchiveApiServer, ArchiveRpc, HealthApiServer, HealthRpc};
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

/// A validated provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Postgres URL of the archive database.
    pub archive_url: Url,
    /// Size of the archive connection pool.
    pub max_connections: u32,
    /// Epoch length and fork schedule.
    pub schedule: EpochSchedule,
    /// GraphQL endpoints of the check nodes.
    pub check_nodes: Vec<Url>,
    /// Trust monitor settings.
    pub monitor: MonitorConfig,
    /// Trust state before the first monitor cycle completes.
    pub trust_bootstrap: bool,
    /// Socket the RPC server binds to.
    pub rpc_socket: SocketAddr,
}

impl Provider {
    /// Connects to the archive, starts the trust monitor and serves the RPC API until
    /// `cancel_token` is cancelled.
    pub async fn start(self, cancel_token: CancellationToken) -> Result<()> {
        let archive = Arc::new(
            PgArchive::connect(self.archive_url.as_str(), self.max_connections)
                .await
                .context("Failed to connect to the archive database")?,
        );

        if self.check_nodes.is_empty() {
            warn!(target: "provider", "No check nodes configured, the archive will be untrusted after the first check");
        }
        let nodes = self
            .check_nodes
            .into_iter()
            .map(|url| Arc::new(GraphQlNodeClient::new(url)) as Arc<dyn NodeHeightSource>)
            .collect();

        let (writer, trust) = trust_state(self.trust_bootstrap);
        let monitor = TrustStateMonitor::new(
            Arc::clone(&archive),
            nodes,
            writer,
            self.monitor,
            cancel_token.clone(),
        );
        let monitor = tokio::spawn(monitor.run());

        let engine = Arc::new(ArchiveEngine::new(self.schedule, archive, trust.clone()));
        let gate = TrustGate::new(trust, self.monitor.recency_threshold);

        let mut module = RpcModule::new(());
        module.merge(ArchiveRpc::new(engine, gate).into_rpc())?;
        module.merge(HealthRpc::new().into_rpc())?;

        let server = Server::builder()
            .build(self.rpc_socket)
            .await
            .with_context(|| format!("Failed to bind the RPC server to {}", self.rpc_socket))?;
        if let Ok(addr) = server.local_addr() {
            info!(target: "archive_rpc", addr = ?addr, "RPC server bound to address");
        } else {
            error!(target: "archive_rpc", "Failed to get local address for RPC server");
        }
        let handle = server.start(module);

        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!(target: "provider", "Stopping RPC server");
                if handle.stop().is_err() {
                    warn!(target: "archive_rpc", "RPC server already stopped");
                }
            }
            _ = handle.clone().stopped() => {
                error!(target: "archive_rpc", "RPC server stopped unexpectedly");
                cancel_token.cancel();
            }
        }
        handle.stopped().await;

        monitor.await.context("Trust monitor task failed")?;
        info!(target: "provider", "Provider stopped");
        Ok(())
    }
}
