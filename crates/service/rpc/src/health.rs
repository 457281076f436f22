use crate::{HealthApiServer, HealthResponse};
use async_trait::async_trait;
use jsonrpsee::core::RpcResult;

/// The health rpc server. Never consults the trust state.
#[derive(Debug, Default)]
pub struct HealthRpc;

impl HealthRpc {
    /// Constructs a new [`HealthRpc`].
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HealthApiServer for HealthRpc {
    async fn health(&self) -> RpcResult<HealthResponse> {
        Ok(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
