//! Best chain height of live nodes.

use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};
use thiserror::Error;
use url::Url;

const BEST_CHAIN_HEIGHT_QUERY: &str =
    "query BestChainHeight { bestChain(maxLength: 1) { protocolState { consensusState { blockHeight } } } }";

/// Errors raised while asking a node for its best chain height.
#[derive(Debug, Error)]
pub enum NodeHeightError {
    /// The request failed or returned a non-success status.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with GraphQL errors.
    #[error("node returned errors: {0}")]
    GraphQl(String),

    /// The node answered without a best chain.
    #[error("node returned an empty best chain")]
    EmptyBestChain,

    /// The height in the answer is not a number.
    #[error("malformed block height {0:?}")]
    MalformedHeight(String),

    /// The node did not answer in time.
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// A source of the network's best chain height.
#[async_trait]
pub trait NodeHeightSource: Debug + Send + Sync {
    /// The node endpoint. Identifies the node in logs and metrics.
    fn url(&self) -> &Url;

    /// Returns the height of the node's best chain tip.
    async fn best_chain_height(&self) -> Result<u64, NodeHeightError>;
}

/// Queries a Mina node's GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlNodeClient {
    url: Url,
    client: reqwest::Client,
}

impl GraphQlNodeClient {
    /// Creates a client for the GraphQL endpoint at `url`.
    pub fn new(url: Url) -> Self {
        Self { url, client: reqwest::Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<BestChainData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestChainData {
    best_chain: Option<Vec<BestChainBlock>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestChainBlock {
    protocol_state: ProtocolState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolState {
    consensus_state: ConsensusState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsensusState {
    block_height: String,
}

impl GraphQlResponse {
    fn best_chain_height(self) -> Result<u64, NodeHeightError> {
        if !self.errors.is_empty() {
            let messages: Vec<_> = self.errors.into_iter().map(|error| error.message).collect();
            return Err(NodeHeightError::GraphQl(messages.join("; ")));
        }

        let tip = self
            .data
            .and_then(|data| data.best_chain)
            .and_then(|chain| chain.into_iter().next())
            .ok_or(NodeHeightError::EmptyBestChain)?;

        let height = tip.protocol_state.consensus_state.block_height;
        height.parse().map_err(|_| NodeHeightError::MalformedHeight(height))
    }
}

#[async_trait]
impl NodeHeightSource for GraphQlNodeClient {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn best_chain_height(&self) -> Result<u64, NodeHeightError> {
        let response: GraphQlResponse = self
            .client
            .post(self.url.clone())
            .json(&serde_json::json!({ "query": BEST_CHAIN_HEIGHT_QUERY }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.best_chain_height()
    }
}
