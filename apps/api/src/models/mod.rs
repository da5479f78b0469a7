pub mod candidate;
pub mod job;
pub mod layer;
pub mod request;
