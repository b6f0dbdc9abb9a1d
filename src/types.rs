// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

use ethers::types::Address as EthAddress;
use ethers::types::H256;
pub use ethers::types::H256 as TxHash;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use strum_macros::Display;

/// USDC uses 6 decimal places; all claim amounts are denominated in these units.
pub const USDC_DECIMALS: u32 = 6;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ClaimId(pub u64);

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProtocolId(pub u32);

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A timestamp observed on chain (block time), in epoch seconds.
///
/// Deliberately a distinct type from [`WallClockTimestamp`]: every claim
/// eligibility window is evaluated against chain time, and the two clocks
/// must never be compared to each other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ChainTimestamp(pub u64);

impl ChainTimestamp {
    pub fn plus_secs(self, secs: u64) -> ChainTimestamp {
        ChainTimestamp(self.0.saturating_add(secs))
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChainTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local machine time, in epoch seconds. Used for diagnostics only, never
/// for eligibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallClockTimestamp(pub u64);

impl WallClockTimestamp {
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        WallClockTimestamp(secs)
    }
}

/// Current phase of a claim in the arbitration protocol.
///
/// The indexer encodes this as a small integer on the wire; it is decoded
/// once at the boundary and matched exhaustively everywhere else. Business
/// logic never compares the numeric values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
#[serde(try_from = "u8", into = "u8")]
pub enum ClaimStatus {
    /// Awaiting review by the protocol claims committee.
    SpccPending = 0,
    /// Committee approved; payout still pending.
    SpccApproved = 1,
    /// Committee denied; the initiator may escalate within a fixed window.
    SpccDenied = 2,
    /// An optimistic-oracle price has been proposed, not yet escalated.
    UmaPriceProposed = 3,
    /// Oracle callback received; ready to submit a dispute.
    ReadyToProposeUmaDispute = 4,
    /// Dispute submitted, awaiting confirmation.
    UmaDisputeProposed = 5,
    /// Escalated to the oracle's full dispute process.
    UmaPending = 6,
    /// Oracle approved; subject to the halt-operator veto window before payout.
    UmaApproved = 7,
    /// Oracle denied. Terminal.
    UmaDenied = 8,
    /// Halt operator vetoed an oracle-approved claim.
    Halted = 9,
    /// Protocol agent removed the claim; readers treat it as nonexistent.
    Cleaned = 10,
    /// Payout executed. Terminal.
    PaidOut = 11,
}

impl ClaimStatus {
    /// True iff the claim can never change status again.
    pub fn is_final(self) -> bool {
        matches!(self, ClaimStatus::PaidOut | ClaimStatus::UmaDenied)
    }
}

/// One entry of a claim's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: ClaimStatus,
    pub timestamp: ChainTimestamp,
}

/// Read model of one insurance claim arbitration case, mirrored from chain
/// state by the indexer.
///
/// `status_updates` is ordered most-recent-first: index 0 is the entry for
/// the *current* status, and its timestamp is "when the claim entered the
/// current status". Every deadline computation relies on that ordering.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: ClaimId,
    pub protocol_id: ProtocolId,
    pub initiator: EthAddress,
    pub receiver: EthAddress,
    /// Claimed payout amount in 6-decimal USDC units. Serialized as a
    /// decimal string; amounts can exceed what a JSON number holds safely.
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
    pub created_at: ChainTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploit_started_at: Option<ChainTimestamp>,
    pub status: ClaimStatus,
    pub status_updates: Vec<StatusUpdate>,
}

impl Claim {
    /// Timestamp at which the claim entered its current status.
    ///
    /// Precondition: the claim is well-formed (`status_updates` non-empty,
    /// head matching `status`). The indexer boundary validates this before
    /// a `Claim` is handed out, so a violation here is a programming error.
    pub fn entered_current_status_at(&self) -> ChainTimestamp {
        debug_assert!(self.is_consistent(), "claim {} has invalid history", self.id);
        self.status_updates[0].timestamp
    }

    /// Whether the status history satisfies the read-model invariant:
    /// non-empty and its head entry matches the current status.
    pub fn is_consistent(&self) -> bool {
        self.status_updates
            .first()
            .map(|head| head.status == self.status)
            .unwrap_or(false)
    }
}

/// A covered protocol, as far as claim handling needs to know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub id: ProtocolId,
    /// The bytes32 identifier used by the claim-manager contract.
    pub identifier: H256,
    /// The protocol agent: the only account allowed to open or clean up claims.
    pub agent: EthAddress,
}

/// Settled result of a mined transaction. Produced at the chain-client
/// boundary; a receipt only exists for transactions that mined successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_status_wire_roundtrip() {
        for raw in 0u8..=11 {
            let status = ClaimStatus::try_from(raw).unwrap();
            assert_eq!(u8::from(status), raw);
        }
        assert!(ClaimStatus::try_from(12u8).is_err());
    }

    #[test]
    fn test_claim_status_terminality() {
        let final_statuses = [ClaimStatus::PaidOut, ClaimStatus::UmaDenied];
        for raw in 0u8..=11 {
            let status = ClaimStatus::try_from(raw).unwrap();
            assert_eq!(
                status.is_final(),
                final_statuses.contains(&status),
                "terminality mismatch for {:?}",
                status
            );
        }
    }

    #[test]
    fn test_claim_consistency() {
        let claim = Claim {
            id: ClaimId(1),
            protocol_id: ProtocolId(7),
            initiator: EthAddress::repeat_byte(0x11),
            receiver: EthAddress::repeat_byte(0x22),
            amount: 1_000_000,
            created_at: ChainTimestamp(1_700_000_000),
            exploit_started_at: None,
            status: ClaimStatus::SpccPending,
            status_updates: vec![StatusUpdate {
                status: ClaimStatus::SpccPending,
                timestamp: ChainTimestamp(1_700_000_000),
            }],
        };
        assert!(claim.is_consistent());
        assert_eq!(
            claim.entered_current_status_at(),
            ChainTimestamp(1_700_000_000)
        );

        let mut bad = claim.clone();
        bad.status = ClaimStatus::SpccApproved;
        assert!(!bad.is_consistent());

        let mut empty = claim;
        empty.status_updates.clear();
        assert!(!empty.is_consistent());
    }

    #[test]
    fn test_claim_json_shape() {
        let json = serde_json::json!({
            "id": 42,
            "protocolId": 7,
            "initiator": "0x1111111111111111111111111111111111111111",
            "receiver": "0x2222222222222222222222222222222222222222",
            "amount": "250000000",
            "createdAt": 1_700_000_000u64,
            "status": 2,
            "statusUpdates": [
                { "status": 2, "timestamp": 1_700_600_000u64 },
                { "status": 0, "timestamp": 1_700_000_000u64 }
            ]
        });
        let claim: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(claim.id, ClaimId(42));
        assert_eq!(claim.status, ClaimStatus::SpccDenied);
        assert_eq!(claim.status_updates.len(), 2);
        assert_eq!(
            claim.entered_current_status_at(),
            ChainTimestamp(1_700_600_000)
        );
        assert_eq!(claim.exploit_started_at, None);
    }

    #[test]
    fn test_chain_timestamp_arithmetic() {
        let t = ChainTimestamp(100);
        assert_eq!(t.plus_secs(50), ChainTimestamp(150));
        assert!(ChainTimestamp(100) < ChainTimestamp(101));
        assert_eq!(ChainTimestamp(u64::MAX).plus_secs(1), ChainTimestamp(u64::MAX));
    }
}
