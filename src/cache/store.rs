//! Cache store implementation
//!
//! Two in-memory partitions (`pages` and `clips`) with policy-aware writes.
//! Reads are lock-free per shard; a write replaces the whole entry for its key
//! in one step, so concurrent writers to the same key resolve last-write-wins
//! and readers never observe a partially written entry.

use dashmap::DashMap;
use hyper::Method;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::keys::{CacheKey, Partition};
use super::policy::{AssetPolicyTable, CacheBehavior};
use crate::types::FetchedResponse;

/// A cached response with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub response: FetchedResponse,
    /// ETag for HTTP caching (SHA256 of body)
    pub etag: String,
    /// When this entry was written
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn new(key: CacheKey, response: FetchedResponse) -> Self {
        let etag = Self::compute_etag(&response.body);
        Self {
            key,
            response,
            etag,
            stored_at: Instant::now(),
        }
    }

    fn compute_etag(data: &[u8]) -> String {
        let hash = Sha256::digest(data);
        format!("\"{}\"", hex::encode(&hash[..16]))
    }

    pub fn size(&self) -> u64 {
        self.response.len()
    }
}

/// Statistics for one partition
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionStats {
    pub entries: usize,
    pub bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct PartitionStore {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PartitionStore {
    fn stats(&self) -> PartitionStats {
        PartitionStats {
            entries: self.entries.len(),
            bytes: self.entries.iter().map(|e| e.size()).sum(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Partitioned response cache
pub struct CacheStore {
    pages: PartitionStore,
    clips: PartitionStore,
    policies: Arc<AssetPolicyTable>,
}

impl CacheStore {
    pub fn new(policies: Arc<AssetPolicyTable>) -> Self {
        Self {
            pages: PartitionStore::default(),
            clips: PartitionStore::default(),
            policies,
        }
    }

    pub fn policies(&self) -> &AssetPolicyTable {
        &self.policies
    }

    fn partition(&self, partition: Partition) -> &PartitionStore {
        match partition {
            Partition::Pages => &self.pages,
            Partition::Clips => &self.clips,
        }
    }

    /// Write a response if the asset policy for its path allows it.
    ///
    /// Returns whether the entry was written.
    pub fn cache_response(
        &self,
        partition: Partition,
        key: &CacheKey,
        response: &FetchedResponse,
        method: &Method,
    ) -> bool {
        let policy = self.policies.resolve(key.path());

        if let CacheBehavior::Unrecognized(name) = &policy.behavior {
            warn!(
                path = %key.path(),
                behavior = %name,
                "Unknown cache behavior, treating as successful"
            );
        }

        if !policy.permits(response.status, method) {
            debug!(
                partition = %partition,
                key = %key,
                status = %response.status,
                behavior = policy.behavior.name(),
                "Cache write skipped by policy"
            );
            return false;
        }

        self.put_response(partition, key, response.clone());
        true
    }

    /// Write unconditionally. Only for content with no origin (uploaded files).
    pub fn put_response(&self, partition: Partition, key: &CacheKey, response: FetchedResponse) {
        let entry = CacheEntry::new(key.clone(), response);
        debug!(partition = %partition, key = %key, size = entry.size(), "Cache set");
        self.partition(partition)
            .entries
            .insert(key.to_storage_key(), entry);
    }

    /// Exact lookup, no fallback across partitions or methods
    pub fn get_response(&self, partition: Partition, key: &CacheKey) -> Option<CacheEntry> {
        let store = self.partition(partition);
        match store.entries.get(&key.to_storage_key()) {
            Some(entry) => {
                store.hits.fetch_add(1, Ordering::Relaxed);
                debug!(partition = %partition, key = %key, "Cache hit");
                Some(entry.value().clone())
            }
            None => {
                store.misses.fetch_add(1, Ordering::Relaxed);
                debug!(partition = %partition, key = %key, "Cache miss");
                None
            }
        }
    }

    pub fn contains(&self, partition: Partition, key: &CacheKey) -> bool {
        self.partition(partition)
            .entries
            .contains_key(&key.to_storage_key())
    }

    /// Remove an entry; returns whether one existed
    pub fn delete_response(&self, partition: Partition, key: &CacheKey) -> bool {
        let removed = self
            .partition(partition)
            .entries
            .remove(&key.to_storage_key())
            .is_some();
        if removed {
            debug!(partition = %partition, key = %key, "Cache entry deleted");
        }
        removed
    }

    pub fn stats(&self, partition: Partition) -> PartitionStats {
        self.partition(partition).stats()
    }
}
