use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::service::SearchPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// An asynchronous search. Mutated only by the job runner; frozen once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub cache_key: String,
    pub status: JobStatus,
    /// 0–100, never decreasing.
    pub progress: u8,
    /// Page requested by the submission that created the job. A resubmission
    /// deduplicated onto this job does not change it; other pages come from
    /// `GET /searches/{key}/results` once the job completes.
    pub page: usize,
    pub page_size: usize,
    /// The page above, set on completion.
    pub result: Option<SearchPage>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn queued(cache_key: String, page: usize, page_size: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            cache_key,
            status: JobStatus::Queued,
            progress: 0,
            page,
            page_size,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
