//! The single entry point for generation, paging and job
//! polling. Owned by `AppState`; every handler goes through it.
//!
//! Sync path:  validate → cache lookup → (miss) pipeline → cache → page
//! Async path: validate → job runner (dedup by key) → worker runs the sync path

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::design::pipeline::{run_generation, PipelineDeps};
use crate::design::verification::MechanicsConfig;
use crate::errors::AppError;
use crate::models::candidate::{EmissionLevel, EvaluatedCandidate};
use crate::models::job::{Job, JobStatus};
use crate::models::request::{SearchRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::scoring::{CostScorer, EmissionsScorer};
use crate::search::cache::{CacheEntry, ResultCache};
use crate::search::jobs::JobRunner;
use crate::search::sink::{persist_in_background, CandidateSink};

/// One page of a generated search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub cache_key: String,
    pub cached: bool,
    pub nec: f64,
    pub total_combinations_seen: usize,
    /// More combinations existed than the cap allowed.
    pub truncated: bool,
    pub rejected: usize,
    /// Candidates matching the read filters, across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub candidates: Vec<EvaluatedCandidate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerateResponse {
    Completed(SearchPage),
    Accepted {
        job_id: Uuid,
        cache_key: String,
        status: JobStatus,
    },
}

/// Read-time paging and filters over a cached search.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    pub emission_level: Option<EmissionLevel>,
    pub max_cost_per_area: Option<f64>,
}

impl Default for ResultQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            emission_level: None,
            max_cost_per_area: None,
        }
    }
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl ResultQuery {
    fn validate(&self) -> Result<(), AppError> {
        if self.page == 0 {
            return Err(AppError::Validation("page starts at 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "page_size must be within 1..={MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    /// Unscored candidates never match an active score filter.
    fn matches(&self, candidate: &EvaluatedCandidate) -> bool {
        if let Some(level) = self.emission_level {
            match candidate.emissions.value() {
                Some(e) if e.level == level => {}
                _ => return false,
            }
        }
        if let Some(max_cost) = self.max_cost_per_area {
            match candidate.cost.value() {
                Some(c) if c.total_per_area <= max_cost => {}
                _ => return false,
            }
        }
        true
    }
}

pub struct SearchService {
    deps: PipelineDeps,
    cache: ResultCache,
    jobs: JobRunner,
    sink: Arc<dyn CandidateSink>,
}

impl SearchService {
    pub fn new(
        config: &Config,
        emissions: Arc<dyn EmissionsScorer>,
        cost: Arc<dyn CostScorer>,
        sink: Arc<dyn CandidateSink>,
    ) -> Self {
        Self {
            deps: PipelineDeps {
                mechanics: MechanicsConfig::default(),
                emissions,
                cost,
                default_cap: config.combination_cap,
                enrich_concurrency: config.enrich_concurrency,
            },
            cache: ResultCache::new(std::time::Duration::from_secs(config.cache_ttl_secs)),
            jobs: JobRunner::new(std::time::Duration::from_secs(config.job_retention_secs)),
            sink,
        }
    }

    /// Validates `request`, then either answers with the requested page or
    /// hands the work to the job runner.
    pub async fn generate(self: &Arc<Self>, request: SearchRequest) -> Result<GenerateResponse, AppError> {
        request.validate()?;
        let key = request.cache_key(self.deps.default_cap)?;

        if request.asynchronous {
            let job_id = self.submit(request, key.clone());
            let status = self.jobs.status(job_id)?.status;
            return Ok(GenerateResponse::Accepted {
                job_id,
                cache_key: key,
                status,
            });
        }

        let page = self.search(&request, &key, &|_| {}).await?;
        Ok(GenerateResponse::Completed(page))
    }

    /// Schedules the search. When a job for `key` is already in flight its id
    /// is returned and this request's page is ignored; the caller pages
    /// through `results` instead.
    fn submit(self: &Arc<Self>, request: SearchRequest, key: String) -> Uuid {
        let service = Arc::clone(self);
        let (page, page_size) = (request.page, request.page_size);
        self.jobs.submit(key.clone(), page, page_size, move |reporter| async move {
            service
                .search(&request, &key, &|percent| reporter.report(percent))
                .await
        })
    }

    /// Cache-or-generate, then slice the requested page.
    async fn search(
        &self,
        request: &SearchRequest,
        key: &str,
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<SearchPage, AppError> {
        let query = ResultQuery {
            page: request.page,
            page_size: request.page_size,
            ..ResultQuery::default()
        };

        if let Some(entry) = self.cache.get(key).await {
            info!("Serving search {} from cache", key);
            return Ok(paginate(key, &entry, true, &query));
        }

        let outcome = run_generation(request, &self.deps, progress).await?;
        let entry = CacheEntry::from_outcome(outcome, Utc::now());
        self.cache.insert(key.to_string(), entry.clone()).await;
        persist_in_background(
            Arc::clone(&self.sink),
            key.to_string(),
            Arc::clone(&entry.candidates),
        );

        Ok(paginate(key, &entry, false, &query))
    }

    /// Pages through a cached search with read-time filters.
    pub async fn results(&self, key: &str, query: &ResultQuery) -> Result<SearchPage, AppError> {
        query.validate()?;
        let entry = self.cached_entry(key).await?;
        Ok(paginate(key, &entry, true, query))
    }

    /// Every candidate of a cached search, in generation order.
    pub async fn candidates(&self, key: &str) -> Result<Arc<Vec<EvaluatedCandidate>>, AppError> {
        Ok(self.cached_entry(key).await?.candidates)
    }

    pub fn job_status(&self, id: Uuid) -> Result<Job, AppError> {
        self.jobs.status(id)
    }

    /// Evicts expired searches; returns how many went.
    pub async fn sweep_cache(&self) -> usize {
        let evicted = self.cache.sweep().await;
        debug!("{} cached searches remain after sweep", self.cache.len().await);
        evicted
    }

    /// Cached searches and retained jobs.
    pub async fn footprint(&self) -> (usize, usize) {
        (self.cache.len().await, self.jobs.len())
    }

    /// Drops finished jobs past their retention; returns how many went.
    pub fn sweep_jobs(&self) -> usize {
        let evicted = self.jobs.sweep();
        debug!("{} jobs remain after sweep", self.jobs.len());
        evicted
    }

    async fn cached_entry(&self, key: &str) -> Result<CacheEntry, AppError> {
        self.cache
            .get(key)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Search {key} not found or expired")))
    }
}

fn paginate(key: &str, entry: &CacheEntry, cached: bool, query: &ResultQuery) -> SearchPage {
    let matching: Vec<&EvaluatedCandidate> =
        entry.candidates.iter().filter(|c| query.matches(c)).collect();
    let start = (query.page - 1).saturating_mul(query.page_size);
    let candidates = matching
        .iter()
        .skip(start)
        .take(query.page_size)
        .map(|c| (*c).clone())
        .collect();

    SearchPage {
        cache_key: key.to_string(),
        cached,
        nec: entry.nec,
        total_combinations_seen: entry.total_combinations_seen,
        truncated: entry.truncated,
        rejected: entry.rejected,
        total: matching.len(),
        page: query.page,
        page_size: query.page_size,
        candidates,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::reference_service;
    use super::*;
    use crate::models::request::fixtures::{deep_section_request, two_layer_request};
    use crate::scoring::ReferenceScorer;
    use crate::search::sink::testing::RecordingSink;

    async fn completed(service: &Arc<SearchService>, request: SearchRequest) -> SearchPage {
        match service.generate(request).await.unwrap() {
            GenerateResponse::Completed(page) => page,
            other => panic!("expected a completed page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let service = reference_service();
        let first = completed(&service, deep_section_request()).await;
        assert!(!first.cached);
        assert_eq!(first.total, 9);

        let second = completed(&service, deep_section_request()).await;
        assert!(second.cached);
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.cache_key, second.cache_key);
    }

    #[tokio::test]
    async fn test_pagination_slices_in_order() {
        let service = reference_service();
        let mut request = deep_section_request();
        request.page_size = 4;
        let first = completed(&service, request.clone()).await;
        assert_eq!(first.candidates.len(), 4);

        request.page = 3;
        let last = completed(&service, request.clone()).await;
        assert_eq!(last.candidates.len(), 1);
        assert_eq!(last.total, 9);

        request.page = 4;
        let beyond = completed(&service, request).await;
        assert!(beyond.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_scheduling() {
        let service = reference_service();
        let mut request = two_layer_request();
        request.layers[0].step = -1.0;
        request.asynchronous = true;
        assert!(matches!(
            service.generate(request).await,
            Err(AppError::InvalidConstraint(_))
        ));
    }

    #[tokio::test]
    async fn test_async_generation_completes_and_fills_cache() {
        let service = reference_service();
        let mut request = deep_section_request();
        request.asynchronous = true;

        let (job_id, key) = match service.generate(request.clone()).await.unwrap() {
            GenerateResponse::Accepted { job_id, cache_key, .. } => (job_id, cache_key),
            other => panic!("expected accepted, got {other:?}"),
        };
        // Duplicate submission while in flight.
        match service.generate(request).await.unwrap() {
            GenerateResponse::Accepted { job_id: again, .. } => assert_eq!(again, job_id),
            other => panic!("expected accepted, got {other:?}"),
        }

        let mut job = service.job_status(job_id).unwrap();
        for _ in 0..400 {
            if job.status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            job = service.job_status(job_id).unwrap();
        }
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result.as_ref().map(|p| p.total), Some(9));

        let page = service.results(&key, &ResultQuery::default()).await.unwrap();
        assert_eq!(page.total, 9);
        assert!(page.cached);
    }

    async fn accepted(service: &Arc<SearchService>, request: SearchRequest) -> (Uuid, String) {
        match service.generate(request).await.unwrap() {
            GenerateResponse::Accepted { job_id, cache_key, .. } => (job_id, cache_key),
            other => panic!("expected accepted, got {other:?}"),
        }
    }

    async fn wait_terminal(service: &Arc<SearchService>, id: Uuid) -> Job {
        for _ in 0..400 {
            let job = service.job_status(id).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("job {id} never finished");
    }

    #[tokio::test]
    async fn test_deduplicated_submission_keeps_first_page() {
        let service = reference_service();
        let mut request = deep_section_request();
        request.asynchronous = true;
        request.page_size = 4;
        let (job_id, key) = accepted(&service, request.clone()).await;

        request.page = 2;
        let (again, _) = accepted(&service, request).await;
        assert_eq!(again, job_id);

        let job = wait_terminal(&service, job_id).await;
        assert_eq!(job.page, 1);
        let first = job.result.unwrap();
        assert_eq!(first.page, 1);

        // The second caller's page comes from the cached results.
        let query = ResultQuery {
            page: 2,
            page_size: 4,
            ..ResultQuery::default()
        };
        let second = service.results(&key, &query).await.unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(second.candidates.len(), 4);
        assert!(second.candidates.iter().all(|c| !first.candidates.contains(c)));
    }

    #[tokio::test]
    async fn test_finished_jobs_are_swept_after_retention() {
        let scorer = Arc::new(ReferenceScorer::default());
        let config = Config {
            job_retention_secs: 0,
            ..Config::default()
        };
        let service = Arc::new(SearchService::new(
            &config,
            scorer.clone(),
            scorer,
            Arc::new(crate::search::sink::TracingSink),
        ));
        let mut request = deep_section_request();
        request.asynchronous = true;
        let (job_id, key) = accepted(&service, request).await;
        wait_terminal(&service, job_id).await;

        assert_eq!(service.sweep_jobs(), 1);
        assert!(matches!(service.job_status(job_id), Err(AppError::NotFound(_))));
        // The search itself stays cached.
        assert_eq!(service.results(&key, &ResultQuery::default()).await.unwrap().total, 9);
    }

    #[tokio::test]
    async fn test_read_filters() {
        let service = reference_service();
        let page = completed(&service, deep_section_request()).await;
        let key = page.cache_key.clone();

        let cheapest = page
            .candidates
            .iter()
            .filter_map(|c| c.cost.value().map(|v| v.total_per_area))
            .fold(f64::INFINITY, f64::min);
        let query = ResultQuery {
            max_cost_per_area: Some(cheapest),
            ..ResultQuery::default()
        };
        let filtered = service.results(&key, &query).await.unwrap();
        assert!(filtered.total >= 1 && filtered.total < 9);

        let level = page.candidates[0].emissions.value().unwrap().level;
        let query = ResultQuery {
            emission_level: Some(level),
            ..ResultQuery::default()
        };
        let by_level = service.results(&key, &query).await.unwrap();
        assert!(by_level
            .candidates
            .iter()
            .all(|c| c.emissions.value().map(|e| e.level) == Some(level)));
    }

    #[tokio::test]
    async fn test_unknown_search_is_not_found() {
        let service = reference_service();
        assert!(matches!(
            service.results("missing", &ResultQuery::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_generation() {
        let scorer = Arc::new(ReferenceScorer::default());
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let service = Arc::new(SearchService::new(
            &Config::default(),
            scorer.clone(),
            scorer,
            sink.clone(),
        ));
        let page = completed(&service, deep_section_request()).await;
        assert_eq!(page.total, 9);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(sink.batches.lock().len(), 1);
    }
}
