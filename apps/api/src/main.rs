mod config;
mod design;
mod errors;
mod models;
mod optimizer;
mod routes;
mod scoring;
mod search;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::scoring::{CostScorer, EmissionsScorer, HttpScorer, ReferenceScorer};
use crate::search::service::SearchService;
use crate::search::sink::TracingSink;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pavement API v{}", env!("CARGO_PKG_VERSION"));

    // Scoring backends: external service when configured, reference otherwise
    let (emissions, cost): (Arc<dyn EmissionsScorer>, Arc<dyn CostScorer>) =
        match &config.scoring_service_url {
            Some(url) => {
                let scorer = Arc::new(HttpScorer::new(url.clone())?);
                info!("Scoring via external service at {}", url);
                (scorer.clone(), scorer)
            }
            None => {
                let scorer = Arc::new(ReferenceScorer::default());
                info!("Scoring via in-process reference scorer");
                (scorer.clone(), scorer)
            }
        };

    let search = Arc::new(SearchService::new(
        &config,
        emissions,
        cost,
        Arc::new(TracingSink),
    ));
    info!(
        "Search service ready (cap {}, cache TTL {}s, job retention {}s, enrichment concurrency {})",
        config.combination_cap,
        config.cache_ttl_secs,
        config.job_retention_secs,
        config.enrich_concurrency
    );

    spawn_sweeper(Arc::clone(&search), config.cache_sweep_secs);

    // Build app state
    let state = AppState { search };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Evicts expired cache entries and finished jobs every `interval_secs`.
fn spawn_sweeper(search: Arc<SearchService>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = search.sweep_cache().await;
            if evicted > 0 {
                info!("Cache sweep evicted {} expired searches", evicted);
            } else {
                debug!("Cache sweep found nothing to evict");
            }
            let dropped = search.sweep_jobs();
            if dropped > 0 {
                info!("Job sweep dropped {} finished jobs", dropped);
            }
        }
    });
}
