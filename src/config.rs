// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use ethers::types::Address as EthAddress;
use prometheus::Registry;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tracing::info;

use crate::claim_cache::ClaimCache;
use crate::indexer_client::ClaimIndexerClient;
use crate::metrics::ClaimMetrics;
use crate::tx_tracker::TransactionTracker;

fn default_claim_cache_ttl_secs() -> u64 {
    30
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClaimsClientConfig {
    // Base URL of the claims indexer REST endpoint.
    pub indexer_url: String,
    // Rpc url for the Eth fullnode used to submit transactions.
    pub eth_rpc_url: String,
    // Deployed claim-manager contract address.
    pub claim_manager_address: String,
    // USDC token contract address, for escalation bond approvals.
    pub usdc_token_address: String,
    // If set, the connected chain id is checked against this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_chain_id: Option<u64>,
    // How long a fetched claim snapshot is served from cache.
    #[serde(default = "default_claim_cache_ttl_secs")]
    pub claim_cache_ttl_secs: u64,
    // The port for the metrics endpoint, if metrics are exposed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl ClaimsClientConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config from {:?}: {}", path, e))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config from {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Validate the config and assemble the shared client context.
    pub fn validate(&self, registry: &Registry) -> anyhow::Result<ClaimsContext> {
        info!("Starting config validation");
        let claim_manager_address = EthAddress::from_str(&self.claim_manager_address)
            .map_err(|e| anyhow!("Invalid claim-manager address {}: {}", self.claim_manager_address, e))?;
        let usdc_token_address = EthAddress::from_str(&self.usdc_token_address)
            .map_err(|e| anyhow!("Invalid USDC token address {}: {}", self.usdc_token_address, e))?;
        if self.indexer_url.is_empty() {
            return Err(anyhow!("indexer-url must not be empty"));
        }
        if self.eth_rpc_url.is_empty() {
            return Err(anyhow!("eth-rpc-url must not be empty"));
        }

        let metrics = Arc::new(ClaimMetrics::new(registry));
        let indexer = Arc::new(ClaimIndexerClient::new(
            self.indexer_url.clone(),
            metrics.clone(),
        ));
        let tracker = Arc::new(TransactionTracker::new(metrics.clone()));
        let cache = Arc::new(ClaimCache::with_secs(self.claim_cache_ttl_secs));

        info!(
            indexer_url = %self.indexer_url,
            ?claim_manager_address,
            ?usdc_token_address,
            "Config validation complete"
        );
        Ok(ClaimsContext {
            claim_manager_address,
            usdc_token_address,
            expected_chain_id: self.expected_chain_id,
            eth_rpc_url: self.eth_rpc_url.clone(),
            metrics_port: self.metrics_port,
            metrics,
            indexer,
            tracker,
            cache,
        })
    }
}

/// Shared client context, created once at the application root and passed
/// to the components that need it. Owning the tracker here keeps the
/// one-in-flight-transaction invariant without ambient global state.
pub struct ClaimsContext {
    pub claim_manager_address: EthAddress,
    pub usdc_token_address: EthAddress,
    pub expected_chain_id: Option<u64>,
    /// Fullnode the application connects its wallet/provider to; this crate
    /// only reaches the chain through trait boundaries, so the URL is handed
    /// back for the caller to dial.
    pub eth_rpc_url: String,
    /// Where the caller should serve the metrics registry, if exposed.
    pub metrics_port: Option<u16>,
    pub metrics: Arc<ClaimMetrics>,
    pub indexer: Arc<ClaimIndexerClient>,
    pub tracker: Arc<TransactionTracker>,
    pub cache: Arc<ClaimCache>,
}
