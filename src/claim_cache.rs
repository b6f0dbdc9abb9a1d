// Copyright (c) Fortis, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-protocol TTL cache of claim snapshots.
//!
//! The cache is invalidated, never optimistically updated: after a
//! successful write the entry is dropped and the next read refetches from
//! the indexer. "No active claim" is a cacheable answer too.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::types::{Claim, ProtocolId};

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Option<Claim>,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct ClaimCache {
    entries: RwLock<HashMap<ProtocolId, CacheEntry>>,
    cache_duration: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ClaimCache {
    pub fn new(cache_duration: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            cache_duration,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Return the cached snapshot for a protocol if it is still fresh.
    /// `Some(None)` means a fresh "no active claim" answer.
    pub async fn get_if_valid(&self, protocol: ProtocolId) -> Option<Option<Claim>> {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(&protocol) {
            if entry.fetched_at.elapsed() < self.cache_duration {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.snapshot.clone());
            }
        }
        None
    }

    /// Store a freshly fetched snapshot.
    pub async fn update(&self, protocol: ProtocolId, snapshot: Option<Claim>) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().await;
        entries.insert(
            protocol,
            CacheEntry {
                snapshot,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for a protocol so the next read refetches.
    pub async fn invalidate(&self, protocol: ProtocolId) {
        let mut entries = self.entries.write().await;
        entries.remove(&protocol);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChainTimestamp, ClaimId, ClaimStatus, StatusUpdate};
    use ethers::types::Address as EthAddress;

    fn sample_claim(protocol: ProtocolId) -> Claim {
        Claim {
            id: ClaimId(1),
            protocol_id: protocol,
            initiator: EthAddress::repeat_byte(0x01),
            receiver: EthAddress::repeat_byte(0x02),
            amount: 42_000_000,
            created_at: ChainTimestamp(1_700_000_000),
            exploit_started_at: None,
            status: ClaimStatus::SpccPending,
            status_updates: vec![StatusUpdate {
                status: ClaimStatus::SpccPending,
                timestamp: ChainTimestamp(1_700_000_000),
            }],
        }
    }

    #[tokio::test]
    async fn test_cache_basic() {
        let cache = ClaimCache::with_secs(10);
        let protocol = ProtocolId(1);

        assert!(cache.get_if_valid(protocol).await.is_none());

        let claim = sample_claim(protocol);
        cache.update(protocol, Some(claim.clone())).await;
        assert_eq!(cache.get_if_valid(protocol).await, Some(Some(claim)));
    }

    #[tokio::test]
    async fn test_cache_stores_no_active_claim() {
        let cache = ClaimCache::with_secs(10);
        let protocol = ProtocolId(2);

        cache.update(protocol, None).await;
        // Fresh answer: the protocol has no active claim
        assert_eq!(cache.get_if_valid(protocol).await, Some(None));
    }

    #[tokio::test]
    async fn test_cache_keyed_by_protocol() {
        let cache = ClaimCache::with_secs(10);
        cache.update(ProtocolId(1), Some(sample_claim(ProtocolId(1)))).await;

        assert!(cache.get_if_valid(ProtocolId(1)).await.is_some());
        assert!(cache.get_if_valid(ProtocolId(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = ClaimCache::new(Duration::from_millis(50));
        let protocol = ProtocolId(3);

        cache.update(protocol, Some(sample_claim(protocol))).await;
        assert!(cache.get_if_valid(protocol).await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get_if_valid(protocol).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_invalidate() {
        let cache = ClaimCache::with_secs(100);
        let protocol = ProtocolId(4);

        cache.update(protocol, Some(sample_claim(protocol))).await;
        assert!(cache.get_if_valid(protocol).await.is_some());

        cache.invalidate(protocol).await;
        assert!(cache.get_if_valid(protocol).await.is_none());

        // Invalidating only touches the given protocol
        cache.update(ProtocolId(5), None).await;
        cache.invalidate(protocol).await;
        assert!(cache.get_if_valid(ProtocolId(5)).await.is_some());
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let cache = ClaimCache::with_secs(100);
        let protocol = ProtocolId(6);

        cache.update(protocol, None).await;
        let _ = cache.get_if_valid(protocol).await;
        let _ = cache.get_if_valid(protocol).await;
        let _ = cache.get_if_valid(protocol).await;

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.75).abs() < 0.01);
    }
}
