//! Owned TTL cache for per-chunk analyses.
//!
//! Passed explicitly into the orchestrator rather than living as ambient
//! global state. Keys are chunk texts; a hit short-circuits the provider
//! call entirely. Eviction is insertion-ordered once the capacity bound is
//! reached, and entries expire after the configured TTL.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::providers::ChunkAnalysis;

/// Configuration for [`AnalysisCache`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long an entry stays valid.
    pub ttl: Duration,
    /// Maximum number of live entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            max_entries: 256,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    analysis: ChunkAnalysis,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    map: FxHashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

/// TTL + capacity bounded cache of chunk analyses.
#[derive(Debug)]
pub struct AnalysisCache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl AnalysisCache {
    /// Create a cache with the given bounds.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Look up the analysis for a chunk text. Expired entries are removed on
    /// the way out.
    pub fn get(&self, text: &str) -> Option<ChunkAnalysis> {
        let mut inner = self.inner.lock();
        let expired = match inner.map.get(text) {
            Some(entry) if entry.inserted_at.elapsed() <= self.config.ttl => {
                return Some(entry.analysis.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.map.remove(text);
            inner.order.retain(|k| k != text);
        }
        None
    }

    /// Store the analysis for a chunk text, evicting the oldest entries when
    /// the capacity bound is hit.
    pub fn insert(&self, text: &str, analysis: ChunkAnalysis) {
        if self.config.max_entries == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        if !inner.map.contains_key(text) {
            while inner.map.len() >= self.config.max_entries {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.map.remove(&oldest);
                    }
                    None => break,
                }
            }
            inner.order.push_back(text.to_string());
        }
        inner.map.insert(
            text.to_string(),
            CacheEntry {
                analysis,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of live (possibly expired, not yet reaped) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
