// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::{ChainTimestamp, ClaimStatus};
use thiserror::Error;

/// EIP-1193 code wallet providers use when the user rejects a signing request.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Fixed rejection string some providers surface instead of the code.
pub const USER_REJECTED_MESSAGE: &str = "User denied transaction signature";

/// Outcome of a tracked chain-write operation that did not mine successfully.
///
/// Decided exactly once, at the wallet/provider boundary; downstream code
/// matches on the variant and never re-inspects codes or message strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimTxError {
    /// The user explicitly rejected the signing request in their wallet.
    #[error("transaction signature rejected by user")]
    UserRejected,
    /// Anything else: submission failure, mined-but-reverted, network error.
    #[error("transaction reverted: {0}")]
    Reverted(String),
}

impl ClaimTxError {
    /// Classify a raw provider error into the closed taxonomy.
    ///
    /// Wallet providers surface user rejections either with the reserved
    /// EIP-1193 code or with a fixed message string; everything else is a
    /// revert from the caller's point of view.
    pub fn from_provider(code: Option<i64>, message: &str) -> Self {
        if code == Some(USER_REJECTED_CODE) || message.contains(USER_REJECTED_MESSAGE) {
            ClaimTxError::UserRejected
        } else {
            ClaimTxError::Reverted(message.to_string())
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ClaimTxError::UserRejected)
    }
}

/// Crate-wide error type for claim orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    // No wallet account is connected
    #[error("no wallet account connected")]
    NoWalletConnected,
    // Caller is not the claim initiator
    #[error("connected account is not the claim initiator")]
    NotInitiator,
    // Caller is not the protocol agent
    #[error("connected account is not the protocol agent")]
    NotProtocolAgent,
    // Action not legal in the claim's current status
    #[error("action is not available while claim status is {0}")]
    WrongStatus(ClaimStatus),
    // Escalation only opens after the committee misses its review deadline
    #[error("escalation window has not opened yet; opens at {opens_at}")]
    EscalationNotOpen { opens_at: ChainTimestamp },
    // The 28-day escalation window has elapsed
    #[error("escalation window closed at {ended_at}")]
    EscalationWindowClosed { ended_at: ChainTimestamp },
    // Payout on an oracle-approved claim must outwait the halt-operator veto window
    #[error("halt-operator veto window is active until {until}")]
    VetoWindowActive { until: ChainTimestamp },
    // The protocol has no active claim
    #[error("protocol has no active claim")]
    NoActiveClaim,
    // Indexer returned a claim violating the read-model invariant
    #[error("inconsistent claim snapshot from indexer: {0}")]
    InconsistentClaim(String),
    // Indexer request or decode failure
    #[error("indexer error: {0}")]
    IndexerError(String),
    // The indexer did not reach the target block within the retry budget
    #[error("timed out waiting for indexer to reach block {block}")]
    BlockWaitTimeout { block: u64 },
    // Tracked transaction failed
    #[error(transparent)]
    Tx(#[from] ClaimTxError),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ClaimError {
    /// Short identifier for metrics labels.
    pub fn error_type(&self) -> &'static str {
        match self {
            ClaimError::NoWalletConnected => "no_wallet_connected",
            ClaimError::NotInitiator => "not_initiator",
            ClaimError::NotProtocolAgent => "not_protocol_agent",
            ClaimError::WrongStatus(_) => "wrong_status",
            ClaimError::EscalationNotOpen { .. } => "escalation_not_open",
            ClaimError::EscalationWindowClosed { .. } => "escalation_window_closed",
            ClaimError::VetoWindowActive { .. } => "veto_window_active",
            ClaimError::NoActiveClaim => "no_active_claim",
            ClaimError::InconsistentClaim(_) => "inconsistent_claim",
            ClaimError::IndexerError(_) => "indexer_error",
            ClaimError::BlockWaitTimeout { .. } => "block_wait_timeout",
            ClaimError::Tx(ClaimTxError::UserRejected) => "tx_user_rejected",
            ClaimError::Tx(ClaimTxError::Reverted(_)) => "tx_reverted",
            ClaimError::InternalError(_) => "internal_error",
        }
    }
}

pub type ClaimResult<T> = Result<T, ClaimError>;
