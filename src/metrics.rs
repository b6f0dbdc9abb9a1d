// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, HistogramVec,
    IntCounter, IntCounterVec, IntGauge, Registry,
};

const FINE_GRAINED_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.5, 10., 15., 20., 30., 45., 60., 90., 120., 180.,
    240., 300., 450., 600.,
];

#[derive(Clone, Debug)]
pub struct ClaimMetrics {
    /// Tracked transactions handed to the wallet, by kind
    pub(crate) tx_submitted: IntCounterVec,
    /// Transactions that mined successfully, by kind
    pub(crate) tx_confirmed: IntCounterVec,
    /// Transactions that reverted or failed to submit, by kind
    pub(crate) tx_reverted: IntCounterVec,
    /// Signing requests the user rejected, by kind
    pub(crate) tx_user_denied: IntCounterVec,
    /// Wall-clock latency from submission to settlement, by kind
    pub(crate) tx_latency: HistogramVec,

    /// Indexer requests by method
    pub(crate) indexer_queries: IntCounterVec,
    /// Indexer request failures by method
    pub(crate) indexer_errors: IntCounterVec,
    /// Last block number the indexer reported as processed
    pub(crate) last_indexed_block: IntGauge,

    /// Orchestrated claim actions that ran to completion, by action
    pub(crate) actions_executed: IntCounterVec,
    /// Claim actions refused before reaching the wallet, by action and reason
    pub(crate) actions_rejected: IntCounterVec,

    /// Claim snapshot cache invalidations after successful writes
    pub(crate) cache_invalidations: IntCounter,
}

impl ClaimMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            tx_submitted: register_int_counter_vec_with_registry!(
                "claims_tx_submitted",
                "Total number of tracked transactions handed to the wallet, by kind",
                &["kind"],
                registry,
            )
            .unwrap(),
            tx_confirmed: register_int_counter_vec_with_registry!(
                "claims_tx_confirmed",
                "Total number of tracked transactions mined successfully, by kind",
                &["kind"],
                registry,
            )
            .unwrap(),
            tx_reverted: register_int_counter_vec_with_registry!(
                "claims_tx_reverted",
                "Total number of tracked transactions that reverted or failed, by kind",
                &["kind"],
                registry,
            )
            .unwrap(),
            tx_user_denied: register_int_counter_vec_with_registry!(
                "claims_tx_user_denied",
                "Total number of signing requests rejected by the user, by kind",
                &["kind"],
                registry,
            )
            .unwrap(),
            tx_latency: register_histogram_vec_with_registry!(
                "claims_tx_latency",
                "Latency from transaction submission to settlement, by kind",
                &["kind"],
                FINE_GRAINED_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            indexer_queries: register_int_counter_vec_with_registry!(
                "claims_indexer_queries",
                "Total number of indexer requests, by method",
                &["method"],
                registry,
            )
            .unwrap(),
            indexer_errors: register_int_counter_vec_with_registry!(
                "claims_indexer_errors",
                "Total number of failed indexer requests, by method",
                &["method"],
                registry,
            )
            .unwrap(),
            last_indexed_block: register_int_gauge_with_registry!(
                "claims_last_indexed_block",
                "Last block number the indexer reported as processed",
                registry,
            )
            .unwrap(),
            actions_executed: register_int_counter_vec_with_registry!(
                "claims_actions_executed",
                "Total number of claim actions that ran to completion, by action",
                &["action"],
                registry,
            )
            .unwrap(),
            actions_rejected: register_int_counter_vec_with_registry!(
                "claims_actions_rejected",
                "Total number of claim actions refused by eligibility checks, by action and reason",
                &["action", "reason"],
                registry,
            )
            .unwrap(),
            cache_invalidations: register_int_counter_with_registry!(
                "claims_cache_invalidations",
                "Total number of claim snapshot cache invalidations after writes",
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        Self::new(&Registry::new())
    }
}
