pub mod bulk;
pub mod extract;
pub mod http;
pub mod orchestrator;
pub mod pacing;
pub mod resolver;
pub mod traits;
pub mod types;

pub use bulk::BatchFetcher;
pub use http::{HttpPageFetcher, HttpSearchApi};
pub use orchestrator::{ScrapeOrchestrator, TargetOutcome};
pub use pacing::FixedIntervalPacer;
