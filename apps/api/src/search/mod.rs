// Search orchestration: result cache, async job runner, persist handoff and
// the service that ties them to the design pipeline.

pub mod cache;
pub mod handlers;
pub mod jobs;
pub mod service;
pub mod sink;
