use std::sync::Arc;

use crate::search::service::SearchService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generation, cache, jobs and scoring backends behind one service.
    pub search: Arc<SearchService>,
}
