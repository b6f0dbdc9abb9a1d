// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pure derivations over a claim snapshot: protocol deadlines and
//! terminality. No side effects, no clock reads; callers supply "now".

use crate::types::{ChainTimestamp, Claim, ClaimStatus};

/// The committee has this long after claim creation to review it.
pub const SPCC_REVIEW_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Window during which a denied (or committee-ignored) claim may be
/// escalated to the optimistic oracle.
pub const UMA_ESCALATION_WINDOW_SECS: u64 = 28 * 24 * 60 * 60;

/// After the oracle approves a claim, the halt operator has this long to veto.
pub const UMAHO_VETO_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Bond posted when escalating to the oracle: 9 600 USDC in 6-decimal units.
pub const UMA_ESCALATION_BOND: u128 = 9_600_000_000;

/// Deadline by which the committee must review the claim.
pub fn spcc_deadline(claim: &Claim) -> ChainTimestamp {
    claim.created_at.plus_secs(SPCC_REVIEW_WINDOW_SECS)
}

/// Deadline for escalating a committee-denied claim to the oracle.
///
/// Only defined for `SpccDenied`: 28 days from the denial. A claim the
/// committee never reviewed is also escalatable, but that window hangs off
/// the missed review deadline rather than a status transition; see
/// [`crate::claim_actions::escalation_window`] for the full rule.
pub fn uma_escalation_deadline(claim: &Claim) -> Option<ChainTimestamp> {
    match claim.status {
        ClaimStatus::SpccDenied => Some(
            claim
                .entered_current_status_at()
                .plus_secs(UMA_ESCALATION_WINDOW_SECS),
        ),
        _ => None,
    }
}

/// End of the halt-operator veto window for an oracle-approved claim.
pub fn umaho_veto_deadline(claim: &Claim) -> Option<ChainTimestamp> {
    match claim.status {
        ClaimStatus::UmaApproved => Some(
            claim
                .entered_current_status_at()
                .plus_secs(UMAHO_VETO_WINDOW_SECS),
        ),
        _ => None,
    }
}

/// True iff the claim can never change status again.
pub fn is_final(claim: &Claim) -> bool {
    claim.status.is_final()
}
