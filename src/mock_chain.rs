// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mock implementations of the chain and indexer boundaries for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::types::{Address as EthAddress, H256};

use crate::chain_client::{ClaimManagerContract, ConnectedWallet, Erc20Contract, PendingTx};
use crate::error::{ClaimResult, ClaimTxError};
use crate::indexer_client::IndexerApi;
use crate::types::{
    ChainTimestamp, Claim, ClaimId, ClaimStatus, ProtocolId, TxHash, TxReceipt,
};

/// A scripted pending-transaction handle.
#[derive(Debug, Clone)]
pub struct MockPendingTx {
    hash: TxHash,
    result: Result<TxReceipt, ClaimTxError>,
}

impl MockPendingTx {
    pub fn mined(hash: TxHash, block_number: u64) -> Self {
        Self {
            hash,
            result: Ok(TxReceipt {
                tx_hash: hash,
                block_number,
            }),
        }
    }

    pub fn reverting(hash: TxHash, cause: &str) -> Self {
        Self {
            hash,
            result: Err(ClaimTxError::Reverted(cause.to_string())),
        }
    }

    pub fn boxed(self) -> Box<dyn PendingTx> {
        Box::new(self)
    }
}

#[async_trait]
impl PendingTx for MockPendingTx {
    fn tx_hash(&self) -> TxHash {
        self.hash
    }

    async fn confirmed(self: Box<Self>) -> Result<TxReceipt, ClaimTxError> {
        self.result
    }
}

/// Record of one write call made against the mock contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    Approve {
        spender: EthAddress,
        amount: u128,
    },
    StartClaim {
        protocol: H256,
        amount: u128,
        receiver: EthAddress,
    },
    Escalate {
        claim: ClaimId,
        bond: u128,
    },
    Payout {
        claim: ClaimId,
    },
    CleanUp {
        protocol: H256,
        claim: ClaimId,
    },
}

/// Mock claim-manager + ERC-20 contract pair.
///
/// By default every call broadcasts and mines at the next block number;
/// failures can be scripted per call with [`MockChain::script_failure`].
pub struct MockChain {
    address: EthAddress,
    calls: Mutex<Vec<ChainCall>>,
    next_block: AtomicU64,
    scripted_failures: Mutex<VecDeque<ClaimTxError>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            address: EthAddress::repeat_byte(0xc0),
            calls: Mutex::new(Vec::new()),
            next_block: AtomicU64::new(100),
            scripted_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// The next write call fails with `err` instead of mining.
    pub fn script_failure(&self, err: ClaimTxError) {
        self.scripted_failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Block number the most recent mined call landed in.
    pub fn last_mined_block(&self) -> u64 {
        self.next_block.load(Ordering::SeqCst) - 1
    }

    fn submit(&self, call: ChainCall) -> Result<Box<dyn PendingTx>, ClaimTxError> {
        self.calls.lock().unwrap().push(call);
        if let Some(err) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let block = self.next_block.fetch_add(1, Ordering::SeqCst);
        let hash = TxHash::from_low_u64_be(block);
        Ok(MockPendingTx::mined(hash, block).boxed())
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClaimManagerContract for MockChain {
    async fn start_claim(
        &self,
        protocol: H256,
        amount: u128,
        receiver: EthAddress,
        _exploit_started_at: Option<ChainTimestamp>,
        _ancillary_data: Vec<u8>,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError> {
        self.submit(ChainCall::StartClaim {
            protocol,
            amount,
            receiver,
        })
    }

    async fn escalate(
        &self,
        claim: ClaimId,
        bond: u128,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError> {
        self.submit(ChainCall::Escalate { claim, bond })
    }

    async fn payout_claim(&self, claim: ClaimId) -> Result<Box<dyn PendingTx>, ClaimTxError> {
        self.submit(ChainCall::Payout { claim })
    }

    async fn clean_up(
        &self,
        protocol: H256,
        claim: ClaimId,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError> {
        self.submit(ChainCall::CleanUp { protocol, claim })
    }

    fn address(&self) -> EthAddress {
        self.address
    }
}

#[async_trait]
impl Erc20Contract for MockChain {
    async fn approve(
        &self,
        spender: EthAddress,
        amount: u128,
    ) -> Result<Box<dyn PendingTx>, ClaimTxError> {
        self.submit(ChainCall::Approve { spender, amount })
    }
}

/// Mock indexer read model.
pub struct MockIndexer {
    claims: Mutex<HashMap<ProtocolId, Claim>>,
    head_block: AtomicU64,
    block_timestamp: AtomicU64,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self {
            claims: Mutex::new(HashMap::new()),
            head_block: AtomicU64::new(0),
            block_timestamp: AtomicU64::new(0),
        }
    }

    pub fn set_claim(&self, claim: Claim) {
        self.claims.lock().unwrap().insert(claim.protocol_id, claim);
    }

    pub fn remove_claim(&self, protocol: ProtocolId) {
        self.claims.lock().unwrap().remove(&protocol);
    }

    pub fn set_head_block(&self, block: u64) {
        self.head_block.store(block, Ordering::SeqCst);
    }

    pub fn set_block_timestamp(&self, ts: ChainTimestamp) {
        self.block_timestamp.store(ts.0, Ordering::SeqCst);
    }
}

impl Default for MockIndexer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexerApi for MockIndexer {
    async fn active_claim(&self, protocol: ProtocolId) -> ClaimResult<Option<Claim>> {
        let claim = self.claims.lock().unwrap().get(&protocol).cloned();
        // Same contract as the real client: cleaned claims do not exist
        Ok(claim.filter(|c| c.status != ClaimStatus::Cleaned))
    }

    async fn latest_block_timestamp(&self) -> ClaimResult<ChainTimestamp> {
        Ok(ChainTimestamp(self.block_timestamp.load(Ordering::SeqCst)))
    }

    async fn last_indexed_block(&self) -> ClaimResult<u64> {
        Ok(self.head_block.load(Ordering::SeqCst))
    }
}

/// Mock wallet with a settable connected account.
pub struct MockWallet {
    account: Mutex<Option<EthAddress>>,
}

impl MockWallet {
    pub fn connected(account: EthAddress) -> Self {
        Self {
            account: Mutex::new(Some(account)),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            account: Mutex::new(None),
        }
    }

    pub fn set_account(&self, account: Option<EthAddress>) {
        *self.account.lock().unwrap() = account;
    }
}

impl ConnectedWallet for MockWallet {
    fn connected_account(&self) -> Option<EthAddress> {
        *self.account.lock().unwrap()
    }
}
