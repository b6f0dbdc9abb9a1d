// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Async client for the claims indexer REST endpoint.
//!
//! The indexer mirrors on-chain claim state into the read model. Reads are
//! eventually consistent: after a write, callers use [`IndexerApi::wait_for_block`]
//! to make sure the indexer has processed the transaction's block before
//! refetching, otherwise the refetch races the indexer and reads stale state.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ClaimError, ClaimResult};
use crate::metrics::ClaimMetrics;
use crate::types::{ChainTimestamp, Claim, ClaimStatus, ProtocolId};

/// How often `wait_for_block` polls the indexer head.
const BLOCK_WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Give up waiting for a block after this many polls (60 seconds).
const BLOCK_WAIT_MAX_POLLS: u32 = 120;

/// Read surface of the indexer, mockable for tests.
#[async_trait]
pub trait IndexerApi: Send + Sync {
    /// The active claim for a protocol, if any. A claim in status `Cleaned`
    /// is reported as no active claim.
    async fn active_claim(&self, protocol: ProtocolId) -> ClaimResult<Option<Claim>>;

    /// Timestamp of the latest block the indexer has observed. This is the
    /// "now" for every eligibility check; wall clock is never used.
    async fn latest_block_timestamp(&self) -> ClaimResult<ChainTimestamp>;

    /// Highest block number the indexer has processed.
    async fn last_indexed_block(&self) -> ClaimResult<u64>;

    /// Poll until the indexer has processed `block`, or give up after the
    /// retry budget.
    async fn wait_for_block(&self, block: u64) -> ClaimResult<()> {
        for i in 0..BLOCK_WAIT_MAX_POLLS {
            match self.last_indexed_block().await {
                Ok(head) if head >= block => {
                    debug!(block, head, "indexer caught up");
                    return Ok(());
                }
                Ok(head) => {
                    if i % 10 == 0 {
                        debug!(block, head, "waiting for indexer to catch up");
                    }
                }
                Err(e) => {
                    warn!(block, ?e, "failed to read indexer head, retrying");
                }
            }
            tokio::time::sleep(BLOCK_WAIT_POLL_INTERVAL).await;
        }
        Err(ClaimError::BlockWaitTimeout { block })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    ok: bool,
    error: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexerStatus {
    last_indexed_block: u64,
    last_block_timestamp: u64,
}

#[derive(Clone, Debug)]
pub struct ClaimIndexerClient {
    http_client: reqwest::Client,
    base_url: String,
    metrics: Arc<ClaimMetrics>,
}

impl ClaimIndexerClient {
    pub fn new(base_url: impl Into<String>, metrics: Arc<ClaimMetrics>) -> Self {
        fn shared_http_client() -> reqwest::Client {
            static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
            CLIENT
                .get_or_init(|| {
                    reqwest::Client::builder()
                        .pool_max_idle_per_host(16)
                        .tcp_keepalive(Some(Duration::from_secs(30)))
                        .connect_timeout(Duration::from_secs(2))
                        .timeout(Duration::from_secs(30))
                        .build()
                        .expect("Failed to build reqwest client")
                })
                .clone()
        }

        let base_url = base_url.into();
        Self {
            http_client: shared_http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics,
        }
    }

    /// Fetch one endpoint. `data: null` (or an omitted `data` field) on a
    /// successful envelope is a legitimate answer, returned as `None`;
    /// endpoints whose data is mandatory go through [`Self::get_json`].
    async fn get_json_opt<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
    ) -> ClaimResult<Option<T>> {
        self.metrics.indexer_queries.with_label_values(&[method]).inc();
        let url = format!("{}{}", self.base_url, path);
        let result: ClaimResult<Option<T>> = async {
            let response = self
                .http_client
                .get(&url)
                .send()
                .await
                .map_err(|e| ClaimError::IndexerError(format!("request failed: {e}")))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClaimError::IndexerError(format!(
                    "{url} returned HTTP {status}"
                )));
            }
            let body: ApiResponse<T> = response
                .json()
                .await
                .map_err(|e| ClaimError::IndexerError(format!("invalid response body: {e}")))?;
            if !body.ok {
                return Err(ClaimError::IndexerError(
                    body.error.unwrap_or_else(|| "unspecified indexer error".to_string()),
                ));
            }
            Ok(body.data)
        }
        .await;
        if result.is_err() {
            self.metrics.indexer_errors.with_label_values(&[method]).inc();
        }
        result
    }

    async fn get_json<T: DeserializeOwned>(&self, method: &str, path: &str) -> ClaimResult<T> {
        match self.get_json_opt(method, path).await? {
            Some(data) => Ok(data),
            None => {
                self.metrics.indexer_errors.with_label_values(&[method]).inc();
                Err(ClaimError::IndexerError(format!(
                    "{path} returned no data"
                )))
            }
        }
    }

    async fn status(&self) -> ClaimResult<IndexerStatus> {
        let status: IndexerStatus = self.get_json("status", "/status").await?;
        self.metrics.last_indexed_block.set(status.last_indexed_block as i64);
        Ok(status)
    }

    fn validate_claim(claim: Claim) -> ClaimResult<Option<Claim>> {
        if !claim.is_consistent() {
            return Err(ClaimError::InconsistentClaim(format!(
                "claim {}: status history is empty or does not match current status {}",
                claim.id, claim.status
            )));
        }
        // Cleaned claims do not exist as far as readers are concerned
        if claim.status == ClaimStatus::Cleaned {
            return Ok(None);
        }
        Ok(Some(claim))
    }
}

#[async_trait]
impl IndexerApi for ClaimIndexerClient {
    async fn active_claim(&self, protocol: ProtocolId) -> ClaimResult<Option<Claim>> {
        let claim: Option<Claim> = self
            .get_json_opt(
                "active_claim",
                &format!("/protocols/{protocol}/active-claim"),
            )
            .await?;
        match claim {
            Some(claim) => Self::validate_claim(claim),
            None => Ok(None),
        }
    }

    async fn latest_block_timestamp(&self) -> ClaimResult<ChainTimestamp> {
        let status = self.status().await?;
        Ok(ChainTimestamp(status.last_block_timestamp))
    }

    async fn last_indexed_block(&self) -> ClaimResult<u64> {
        let status = self.status().await?;
        Ok(status.last_indexed_block)
    }
}
