// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Single-flight tracker for blockchain-write operations.
//!
//! Every write in the system goes through [`TransactionTracker::run`]: it
//! observes the promise lifecycle of one transaction (submission → wallet
//! confirmation → mining → settlement) and publishes each transition so a
//! presentation layer can render the matching modal. The tracker knows
//! nothing about claims; callers know nothing about wallet mechanics beyond
//! this contract.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use strum_macros::Display;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::chain_client::PendingTx;
use crate::error::ClaimTxError;
use crate::metrics::ClaimMetrics;
use crate::types::{TxHash, TxReceipt, WallClockTimestamp};

/// Visual state of the tracked transaction.
///
/// Transitions are one-directional; the only way back to `None` is the
/// explicit dismiss (or the approval short-circuit out of `Pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Default)]
pub enum TxState {
    /// Nothing in flight.
    #[default]
    None,
    /// Factory invoked; waiting for the wallet to confirm and broadcast.
    Requested,
    /// Broadcast with a known hash; waiting to be mined.
    Pending,
    /// Mined successfully.
    Success,
    /// Submission failed, or mined but reverted.
    Reverted,
    /// The user rejected the signing request.
    UserDenied,
}

impl TxState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::Success | TxState::Reverted | TxState::UserDenied)
    }
}

/// What the tracked transaction is for. Selects user-facing copy only,
/// except `Approval`, which short-circuits the success screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TxKind {
    Approval,
    StartClaim,
    Escalate,
    Payout,
    CleanUp,
}

impl TxKind {
    /// Approvals are a setup step; a success screen for them is noise, and
    /// the caller is expected to immediately submit the follow-up call.
    pub fn is_approval(self) -> bool {
        matches!(self, TxKind::Approval)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            TxKind::Approval => "approval",
            TxKind::StartClaim => "start_claim",
            TxKind::Escalate => "escalate",
            TxKind::Payout => "payout",
            TxKind::CleanUp => "clean_up",
        }
    }
}

/// Snapshot of the tracker published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerView {
    pub state: TxState,
    /// Known once the wallet broadcasts. Cleared for `UserDenied`: no raw
    /// error detail is surfaced for a rejected signature.
    pub tx_hash: Option<TxHash>,
    pub kind: Option<TxKind>,
    /// The modal stays visible until the caller dismisses it, even after
    /// the underlying operation has settled.
    pub modal_open: bool,
    /// Local time the operation settled, for display and diagnostics only.
    /// Set on terminal states, `None` while in flight.
    pub settled_at: Option<WallClockTimestamp>,
}

pub struct TransactionTracker {
    /// Held across the whole of `run()`: one transaction in flight at a
    /// time, later callers wait their turn.
    flight: tokio::sync::Mutex<()>,
    current: Mutex<TrackerView>,
    events: broadcast::Sender<TrackerView>,
    metrics: Arc<ClaimMetrics>,
}

impl TransactionTracker {
    pub fn new(metrics: Arc<ClaimMetrics>) -> Self {
        Self {
            flight: tokio::sync::Mutex::new(()),
            current: Mutex::new(TrackerView::default()),
            events: broadcast::channel(64).0,
            metrics,
        }
    }

    /// Subscribe to every state transition, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerView> {
        self.events.subscribe()
    }

    /// The latest published view.
    pub fn current(&self) -> TrackerView {
        *self.current.lock().unwrap()
    }

    /// Acknowledge a settled operation and reset to `None`. A no-op unless
    /// the tracker is in a terminal state.
    pub fn dismiss(&self) {
        let view = self.current();
        if !view.state.is_terminal() {
            debug!(state = %view.state, "dismiss ignored, no settled transaction");
            return;
        }
        self.publish(TrackerView::default());
    }

    /// Run one chain-write operation to settlement.
    ///
    /// `factory` performs the actual wallet call and returns the pending
    /// transaction handle. The returned error is the original classified
    /// failure, so callers can still branch on it; the published state
    /// already carries everything the presentation layer needs.
    pub async fn run<F, Fut>(&self, kind: TxKind, factory: F) -> Result<TxReceipt, ClaimTxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Box<dyn PendingTx>, ClaimTxError>> + Send,
    {
        let _flight = self.flight.lock().await;
        let started = Instant::now();
        let label = kind.as_label();

        self.publish(TrackerView {
            state: TxState::Requested,
            tx_hash: None,
            kind: Some(kind),
            modal_open: true,
            settled_at: None,
        });
        self.metrics.tx_submitted.with_label_values(&[label]).inc();

        let pending = match factory().await {
            Ok(pending) => pending,
            Err(err) => return Err(self.settle_failure(kind, None, started, err)),
        };

        let tx_hash = pending.tx_hash();
        info!(kind = %kind, ?tx_hash, "transaction broadcast, awaiting mining");
        self.publish(TrackerView {
            state: TxState::Pending,
            tx_hash: Some(tx_hash),
            kind: Some(kind),
            modal_open: true,
            settled_at: None,
        });

        match pending.confirmed().await {
            Ok(receipt) => {
                self.metrics.tx_confirmed.with_label_values(&[label]).inc();
                self.metrics
                    .tx_latency
                    .with_label_values(&[label])
                    .observe(started.elapsed().as_secs_f64());
                info!(
                    kind = %kind,
                    ?tx_hash,
                    block = receipt.block_number,
                    "transaction mined"
                );
                if kind.is_approval() {
                    self.publish(TrackerView::default());
                } else {
                    self.publish(TrackerView {
                        state: TxState::Success,
                        tx_hash: Some(tx_hash),
                        kind: Some(kind),
                        modal_open: true,
                        settled_at: Some(WallClockTimestamp::now()),
                    });
                }
                Ok(receipt)
            }
            Err(err) => Err(self.settle_failure(kind, Some(tx_hash), started, err)),
        }
    }

    fn settle_failure(
        &self,
        kind: TxKind,
        tx_hash: Option<TxHash>,
        started: Instant,
        err: ClaimTxError,
    ) -> ClaimTxError {
        let label = kind.as_label();
        self.metrics
            .tx_latency
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        match &err {
            ClaimTxError::UserRejected => {
                // An expected outcome, not an application error
                debug!(kind = %kind, "user rejected signing request");
                self.metrics.tx_user_denied.with_label_values(&[label]).inc();
                self.publish(TrackerView {
                    state: TxState::UserDenied,
                    tx_hash: None,
                    kind: Some(kind),
                    modal_open: true,
                    settled_at: Some(WallClockTimestamp::now()),
                });
            }
            ClaimTxError::Reverted(cause) => {
                error!(kind = %kind, ?tx_hash, cause = %cause, "transaction failed");
                self.metrics.tx_reverted.with_label_values(&[label]).inc();
                self.publish(TrackerView {
                    state: TxState::Reverted,
                    tx_hash,
                    kind: Some(kind),
                    modal_open: true,
                    settled_at: Some(WallClockTimestamp::now()),
                });
            }
        }
        err
    }

    fn publish(&self, view: TrackerView) {
        *self.current.lock().unwrap() = view;
        // Nobody listening is fine; current() still reflects the state
        let _ = self.events.send(view);
    }
}
