//! Delegates both objectives to an external scoring service.
//!
//! Endpoints (JSON in, JSON out):
//! - `POST {base}/emissions` ← `{buckets, distances, process}` → `EmissionsScore`
//! - `POST {base}/cost` ← `{candidate, pricing, distances}` → `CostScore`
//!
//! Retries on 429 and 5xx with exponential backoff. Any remaining failure is
//! returned as a `ScoringError`; the enricher turns it into `Unscored`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::candidate::{Candidate, CostScore, EmissionsScore, MassBuckets};
use crate::models::request::{Distances, Pricing, ProcessParameters};
use crate::scoring::{CostScorer, EmissionsScorer, ScoringError};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct EmissionsRequest<'a> {
    buckets: &'a MassBuckets,
    distances: &'a Distances,
    process: &'a ProcessParameters,
}

#[derive(Debug, Serialize)]
struct CostRequest<'a> {
    candidate: &'a Candidate,
    pricing: &'a Pricing,
    distances: &'a Distances,
}

#[derive(Clone)]
pub struct HttpScorer {
    client: Client,
    base_url: String,
}

impl HttpScorer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POSTs `body` and deserializes the response, retrying transient failures.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ScoringError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut last_error: Option<ScoringError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms
                let delay = std::time::Duration::from_millis(250 * (1 << (attempt - 1)));
                warn!(
                    "Scoring call to {} failed (attempt {}), retrying after {}ms",
                    url,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ScoringError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                last_error = Some(ScoringError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ScoringError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            debug!("Scoring call to {} returned {} bytes", url, bytes.len());
            return decode_body(&bytes);
        }

        Err(last_error.unwrap_or(ScoringError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ScoringError> {
    if bytes.is_empty() {
        return Err(ScoringError::EmptyResponse);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
impl EmissionsScorer for HttpScorer {
    async fn compute_emissions(
        &self,
        buckets: &MassBuckets,
        distances: &Distances,
        process: &ProcessParameters,
    ) -> Result<EmissionsScore, ScoringError> {
        let body = EmissionsRequest {
            buckets,
            distances,
            process,
        };
        self.post_json("emissions", &body).await
    }
}

#[async_trait]
impl CostScorer for HttpScorer {
    async fn compute_cost(
        &self,
        candidate: &Candidate,
        pricing: &Pricing,
        distances: &Distances,
    ) -> Result<CostScore, ScoringError> {
        let body = CostRequest {
            candidate,
            pricing,
            distances,
        };
        self.post_json("cost", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let scorer = HttpScorer::new("http://scoring.local:9000/").unwrap();
        assert_eq!(scorer.endpoint("cost"), "http://scoring.local:9000/cost");
    }

    #[test]
    fn test_malformed_body_is_a_parse_error() {
        let result: Result<CostScore, ScoringError> = decode_body(b"{\"total_per_area\": ");
        assert!(matches!(result, Err(ScoringError::Parse(_))));

        let result: Result<CostScore, ScoringError> = decode_body(b"");
        assert!(matches!(result, Err(ScoringError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_scoring_error() {
        // Port 9 (discard) on loopback refuses connections.
        let scorer = HttpScorer::new("http://127.0.0.1:9").unwrap();
        let buckets = MassBuckets {
            binder: 10.0,
            aggregate: 90.0,
            reclaimed: 0.0,
            bound: 100.0,
            total: 100.0,
            layer_fractions: vec![1.0],
        };
        let result = scorer
            .compute_emissions(&buckets, &Distances::default(), &ProcessParameters::default())
            .await;
        assert!(matches!(result, Err(ScoringError::Http(_))));
    }
}
