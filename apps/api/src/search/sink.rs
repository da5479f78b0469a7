//! Best-effort handoff of freshly generated candidates to storage.
//!
//! The service never waits on a sink: batches are persisted from a spawned
//! task and a failure is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::candidate::EvaluatedCandidate;

#[async_trait]
pub trait CandidateSink: Send + Sync {
    async fn persist(&self, cache_key: &str, batch: &[EvaluatedCandidate]) -> anyhow::Result<()>;
}

/// Default sink: records the handoff in the log and keeps nothing.
pub struct TracingSink;

#[async_trait]
impl CandidateSink for TracingSink {
    async fn persist(&self, cache_key: &str, batch: &[EvaluatedCandidate]) -> anyhow::Result<()> {
        info!(
            "Persist handoff for search {}: {} candidates",
            cache_key,
            batch.len()
        );
        Ok(())
    }
}

/// Fire-and-forget persist of `batch`.
pub fn persist_in_background(
    sink: Arc<dyn CandidateSink>,
    cache_key: String,
    batch: Arc<Vec<EvaluatedCandidate>>,
) {
    tokio::spawn(async move {
        if let Err(e) = sink.persist(&cache_key, &batch).await {
            warn!("Persisting {} candidates for {} failed: {:#}", batch.len(), cache_key, e);
        }
    });
}
