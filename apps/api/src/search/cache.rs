//! Result Cache
//!
//! In-memory, TTL-bounded store of generated searches keyed by the request
//! content hash. Entries share their candidate list through an `Arc`, so a
//! hit never copies the candidates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::design::pipeline::GenerationOutcome;
use crate::models::candidate::EvaluatedCandidate;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub candidates: Arc<Vec<EvaluatedCandidate>>,
    pub total_combinations_seen: usize,
    pub truncated: bool,
    pub nec: f64,
    pub rejected: usize,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn from_outcome(outcome: GenerationOutcome, created_at: DateTime<Utc>) -> Self {
        Self {
            candidates: Arc::new(outcome.candidates),
            total_combinations_seen: outcome.total_combinations_seen,
            truncated: outcome.truncated,
            nec: outcome.nec,
            rejected: outcome.rejected,
            created_at,
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at < ttl
    }
}

pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Utc::now()).await
    }

    /// Lookup against an explicit clock. Expired entries read as misses and
    /// are left for the sweeper.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                debug!("Result cache hit for {}", key);
                Some(entry.clone())
            }
            Some(_) => {
                debug!("Result cache entry for {} expired", key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: String, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
    }

    /// Evicts expired entries, returning how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            candidates: Arc::new(Vec::new()),
            total_combinations_seen: 9,
            truncated: false,
            nec: 182_500.0,
            rejected: 0,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = ResultCache::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        cache.insert("k".into(), entry(t0)).await;

        let hit = cache.get_at("k", t0 + Duration::seconds(59)).await.unwrap();
        assert_eq!(hit.total_combinations_seen, 9);
        assert!(cache.get_at("other", t0).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = ResultCache::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        cache.insert("k".into(), entry(t0)).await;
        assert!(cache.get_at("k", t0 + Duration::seconds(60)).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_expired() {
        let cache = ResultCache::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        cache.insert("old".into(), entry(t0 - Duration::seconds(120))).await;
        cache.insert("new".into(), entry(t0)).await;

        assert_eq!(cache.sweep_at(t0).await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get_at("new", t0).await.is_some());
    }

    #[tokio::test]
    async fn test_hits_share_candidates() {
        let cache = ResultCache::new(std::time::Duration::from_secs(60));
        let t0 = Utc::now();
        cache.insert("k".into(), entry(t0)).await;
        let a = cache.get_at("k", t0).await.unwrap();
        let b = cache.get_at("k", t0).await.unwrap();
        assert!(Arc::ptr_eq(&a.candidates, &b.candidates));
    }
}
