// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Orchestration of claim actions.
//!
//! Decides which actions are legal for the connected account given a
//! claim's status and the latest observed chain time, and drives the
//! transaction tracker to execute them. Status transitions themselves
//! happen on chain (committee, oracle, halt operator); this layer only
//! submits transactions and then refetches, never updating a claim locally.
//!
//! Write pipeline, for every action: eligibility check → tracked
//! transaction(s) → wait until the indexer has processed the receipt's
//! block → invalidate the cached snapshot.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::Address as EthAddress;
use tracing::{info, warn};

use crate::chain_client::{ClaimManagerContract, ConnectedWallet, Erc20Contract};
use crate::claim_cache::ClaimCache;
use crate::claim_status::{spcc_deadline, UMA_ESCALATION_BOND, UMA_ESCALATION_WINDOW_SECS, UMAHO_VETO_WINDOW_SECS};
use crate::error::{ClaimError, ClaimResult};
use crate::indexer_client::IndexerApi;
use crate::metrics::ClaimMetrics;
use crate::retry_with_max_elapsed_time;
use crate::tx_tracker::{TransactionTracker, TxKind};
use crate::types::{ChainTimestamp, Claim, ClaimStatus, Protocol, ProtocolId, TxReceipt};

/// Give up refreshing a snapshot from the indexer after this long.
const FETCH_RETRY_MAX_ELAPSED: Duration = Duration::from_secs(30);

/// Where a claim stands relative to the oracle escalation window.
///
/// The 28-day clock starts at the committee's denial, or at the missed
/// review deadline when the committee never reviewed the claim at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationWindow {
    /// The claim's status admits no escalation.
    NotApplicable,
    /// The committee still has time to review; escalation opens if the
    /// deadline passes unanswered.
    NotYetOpen { opens_at: ChainTimestamp },
    Open { ends_at: ChainTimestamp },
    Closed { ended_at: ChainTimestamp },
}

/// Compute the escalation window for a claim at the given chain time.
pub fn escalation_window(claim: &Claim, now: ChainTimestamp) -> EscalationWindow {
    match claim.status {
        ClaimStatus::SpccDenied => {
            let ends_at = claim
                .entered_current_status_at()
                .plus_secs(UMA_ESCALATION_WINDOW_SECS);
            if now < ends_at {
                EscalationWindow::Open { ends_at }
            } else {
                EscalationWindow::Closed { ended_at: ends_at }
            }
        }
        ClaimStatus::SpccPending => {
            // Eligibility is inferred from the committee missing its
            // deadline; no status transition signals it.
            let review_deadline = spcc_deadline(claim);
            if now <= review_deadline {
                return EscalationWindow::NotYetOpen {
                    opens_at: review_deadline,
                };
            }
            let ends_at = review_deadline.plus_secs(UMA_ESCALATION_WINDOW_SECS);
            if now < ends_at {
                EscalationWindow::Open { ends_at }
            } else {
                EscalationWindow::Closed { ended_at: ends_at }
            }
        }
        _ => EscalationWindow::NotApplicable,
    }
}

/// Check whether `account` may escalate `claim` right now. Returns the end
/// of the open window.
pub fn escalation_eligibility(
    claim: &Claim,
    account: EthAddress,
    now: ChainTimestamp,
) -> ClaimResult<ChainTimestamp> {
    if account != claim.initiator {
        return Err(ClaimError::NotInitiator);
    }
    match escalation_window(claim, now) {
        EscalationWindow::Open { ends_at } => Ok(ends_at),
        EscalationWindow::NotYetOpen { opens_at } => {
            Err(ClaimError::EscalationNotOpen { opens_at })
        }
        EscalationWindow::Closed { ended_at } => {
            Err(ClaimError::EscalationWindowClosed { ended_at })
        }
        EscalationWindow::NotApplicable => Err(ClaimError::WrongStatus(claim.status)),
    }
}

/// Check whether `account` may trigger the payout of `claim` right now.
pub fn payout_eligibility(
    claim: &Claim,
    account: EthAddress,
    now: ChainTimestamp,
) -> ClaimResult<()> {
    if account != claim.initiator {
        return Err(ClaimError::NotInitiator);
    }
    match claim.status {
        ClaimStatus::SpccApproved => Ok(()),
        ClaimStatus::UmaApproved => {
            let until = claim
                .entered_current_status_at()
                .plus_secs(UMAHO_VETO_WINDOW_SECS);
            if now > until {
                Ok(())
            } else {
                Err(ClaimError::VetoWindowActive { until })
            }
        }
        other => Err(ClaimError::WrongStatus(other)),
    }
}

/// Only the protocol agent may clean up a claim; no time gating.
pub fn clean_up_eligibility(protocol: &Protocol, account: EthAddress) -> ClaimResult<()> {
    if account != protocol.agent {
        return Err(ClaimError::NotProtocolAgent);
    }
    Ok(())
}

/// Only the protocol agent may open a claim.
pub fn start_claim_eligibility(protocol: &Protocol, account: EthAddress) -> ClaimResult<()> {
    if account != protocol.agent {
        return Err(ClaimError::NotProtocolAgent);
    }
    Ok(())
}

pub struct ClaimActions {
    claim_manager: Arc<dyn ClaimManagerContract>,
    usdc: Arc<dyn Erc20Contract>,
    indexer: Arc<dyn IndexerApi>,
    cache: Arc<ClaimCache>,
    tracker: Arc<TransactionTracker>,
    wallet: Arc<dyn ConnectedWallet>,
    metrics: Arc<ClaimMetrics>,
}

impl ClaimActions {
    pub fn new(
        claim_manager: Arc<dyn ClaimManagerContract>,
        usdc: Arc<dyn Erc20Contract>,
        indexer: Arc<dyn IndexerApi>,
        cache: Arc<ClaimCache>,
        tracker: Arc<TransactionTracker>,
        wallet: Arc<dyn ConnectedWallet>,
        metrics: Arc<ClaimMetrics>,
    ) -> Self {
        Self {
            claim_manager,
            usdc,
            indexer,
            cache,
            tracker,
            wallet,
            metrics,
        }
    }

    /// The active claim for a protocol, served from the snapshot cache when
    /// fresh and refetched from the indexer otherwise.
    pub async fn active_claim(&self, protocol: ProtocolId) -> ClaimResult<Option<Claim>> {
        if let Some(cached) = self.cache.get_if_valid(protocol).await {
            return Ok(cached);
        }
        let fetched = retry_with_max_elapsed_time!(
            self.indexer.active_claim(protocol),
            FETCH_RETRY_MAX_ELAPSED
        );
        match fetched {
            Ok(Ok(snapshot)) => {
                self.cache.update(protocol, snapshot.clone()).await;
                Ok(snapshot)
            }
            Ok(Err(e)) | Err(e) => {
                warn!(%protocol, ?e, "failed to fetch active claim");
                Err(e)
            }
        }
    }

    /// Escalate the protocol's denied (or committee-ignored) claim to the
    /// optimistic oracle. Posts the bond allowance first.
    pub async fn escalate(&self, protocol: &Protocol) -> ClaimResult<()> {
        let account = self.connected()?;
        let claim = self
            .active_claim(protocol.id)
            .await?
            .ok_or(ClaimError::NoActiveClaim)?;
        let now = self.indexer.latest_block_timestamp().await?;
        let ends_at = self.check("escalate", escalation_eligibility(&claim, account, now))?;
        info!(claim = %claim.id, %ends_at, "escalating claim to oracle");

        // Bond allowance first; the tracker resets to None after an
        // approval so the escalate call follows without a success screen.
        let spender = self.claim_manager.address();
        self.tracker
            .run(TxKind::Approval, || async move {
                self.usdc.approve(spender, UMA_ESCALATION_BOND).await
            })
            .await?;

        let claim_id = claim.id;
        let receipt = self
            .tracker
            .run(TxKind::Escalate, || async move {
                self.claim_manager.escalate(claim_id, UMA_ESCALATION_BOND).await
            })
            .await?;

        self.refresh_after_write(protocol.id, &receipt).await?;
        self.metrics
            .actions_executed
            .with_label_values(&["escalate"])
            .inc();
        Ok(())
    }

    /// Trigger the payout of an approved claim.
    ///
    /// Tracked-transaction failures are swallowed here: the tracker state
    /// already carries the user feedback (denied vs. reverted modal), so
    /// only eligibility problems are surfaced as errors.
    pub async fn payout(&self, protocol: &Protocol) -> ClaimResult<()> {
        let account = self.connected()?;
        let claim = self
            .active_claim(protocol.id)
            .await?
            .ok_or(ClaimError::NoActiveClaim)?;
        let now = self.indexer.latest_block_timestamp().await?;
        self.check("payout", payout_eligibility(&claim, account, now))?;

        let claim_id = claim.id;
        match self
            .tracker
            .run(TxKind::Payout, || async move {
                self.claim_manager.payout_claim(claim_id).await
            })
            .await
        {
            Ok(receipt) => {
                self.refresh_after_write(protocol.id, &receipt).await?;
                self.metrics
                    .actions_executed
                    .with_label_values(&["payout"])
                    .inc();
            }
            Err(err) => {
                warn!(claim = %claim_id, ?err, "payout attempt failed");
            }
        }
        Ok(())
    }

    /// Remove the protocol's claim. Agent only.
    pub async fn clean_up(&self, protocol: &Protocol) -> ClaimResult<()> {
        let account = self.connected()?;
        self.check("clean_up", clean_up_eligibility(protocol, account))?;
        let claim = self
            .active_claim(protocol.id)
            .await?
            .ok_or(ClaimError::NoActiveClaim)?;

        let claim_id = claim.id;
        let identifier = protocol.identifier;
        let receipt = self
            .tracker
            .run(TxKind::CleanUp, || async move {
                self.claim_manager.clean_up(identifier, claim_id).await
            })
            .await?;

        self.refresh_after_write(protocol.id, &receipt).await?;
        self.metrics
            .actions_executed
            .with_label_values(&["clean_up"])
            .inc();
        Ok(())
    }

    /// Open a claim against a covered protocol. Agent only.
    pub async fn start_claim(
        &self,
        protocol: &Protocol,
        amount: u128,
        receiver: EthAddress,
        exploit_started_at: Option<ChainTimestamp>,
        ancillary_data: Vec<u8>,
    ) -> ClaimResult<()> {
        let account = self.connected()?;
        self.check("start_claim", start_claim_eligibility(protocol, account))?;

        let identifier = protocol.identifier;
        let receipt = self
            .tracker
            .run(TxKind::StartClaim, || async move {
                self.claim_manager
                    .start_claim(identifier, amount, receiver, exploit_started_at, ancillary_data)
                    .await
            })
            .await?;

        self.refresh_after_write(protocol.id, &receipt).await?;
        self.metrics
            .actions_executed
            .with_label_values(&["start_claim"])
            .inc();
        Ok(())
    }

    fn connected(&self) -> ClaimResult<EthAddress> {
        self.wallet
            .connected_account()
            .ok_or(ClaimError::NoWalletConnected)
    }

    fn check<T>(&self, action: &str, result: ClaimResult<T>) -> ClaimResult<T> {
        if let Err(err) = &result {
            self.metrics
                .actions_rejected
                .with_label_values(&[action, err.error_type()])
                .inc();
        }
        result
    }

    /// Wait for the indexer to observe the write, then drop the cached
    /// snapshot. Invalidation before the indexer catches up would let the
    /// next read repopulate the cache with pre-write state.
    async fn refresh_after_write(
        &self,
        protocol: ProtocolId,
        receipt: &TxReceipt,
    ) -> ClaimResult<()> {
        self.indexer.wait_for_block(receipt.block_number).await?;
        self.cache.invalidate(protocol).await;
        self.metrics.cache_invalidations.inc();
        Ok(())
    }
}
