// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed boundaries to the on-chain collaborators. The contract logic
//! itself lives on chain; these traits cover exactly the calls the claim
//! lifecycle needs, and every write returns a [`PendingTx`] handle so the
//! transaction tracker can observe submission and mining uniformly.

use crate::error::ClaimTxError;
use crate::types::{ChainTimestamp, ClaimId, TxHash, TxReceipt};
use async_trait::async_trait;
use ethers::types::{Address as EthAddress, H256};

/// A transaction accepted by the wallet and broadcast to the network.
///
/// The hash is available immediately after broadcast; `confirmed` awaits
/// mining and resolves with the receipt, or fails with
/// [`ClaimTxError::Reverted`] if the transaction mined but reverted (or the
/// wait itself failed). There is no client-side timeout on the wait.
#[async_trait]
pub trait PendingTx: Send {
    fn tx_hash(&self) -> TxHash;

    async fn confirmed(self: Box<Self>) -> Result<TxReceipt, ClaimTxError>;
}

/// Write surface of the claim-manager contract.
#[async_trait]
pub trait ClaimManagerContract: Send + Sync {
    /// Open a claim against a covered protocol. Agent-only on chain.
    async fn start_claim(
        &self,
        protocol: H256,
        amount: u128,
        receiver: EthAddress,
        exploit_started_at: Option<ChainTimestamp>,
        ancillary_data: Vec<u8>,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError>;

    /// Escalate a denied or committee-ignored claim to the optimistic
    /// oracle, posting the escalation bond.
    async fn escalate(
        &self,
        claim: ClaimId,
        bond: u128,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError>;

    /// Execute the payout for an approved claim.
    async fn payout_claim(&self, claim: ClaimId) -> Result<Box<dyn PendingTx>, ClaimTxError>;

    /// Remove a claim. Agent-only on chain.
    async fn clean_up(
        &self,
        protocol: H256,
        claim: ClaimId,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError>;

    /// Deployed contract address; the spender for bond approvals.
    fn address(&self) -> EthAddress;
}

/// The one ERC-20 call the claim flow needs: granting the claim manager an
/// allowance for the escalation bond.
#[async_trait]
pub trait Erc20Contract: Send + Sync {
    async fn approve(
        &self,
        spender: EthAddress,
        amount: u128,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError>;
}

/// The wallet's contribution to orchestration: which account is connected.
/// Signing happens inside the contract implementations.
pub trait ConnectedWallet: Send + Sync {
    fn connected_account(&self) -> Option<EthAddress>;
}
