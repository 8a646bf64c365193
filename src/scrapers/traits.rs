use crate::error::ScrapeError;
use crate::scrapers::types::FetchedPage;
use async_trait::async_trait;
use serde_json::Value;

/// Fetches a listing page. Implementations issue exactly one request per call,
/// with no retries.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Network-level failures are errors; any HTTP status is returned as data.
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ScrapeError>;
}

/// Authenticated bulk listing lookup by rental identifier
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn fetch_listings(&self, token: &str, rental_ids: &[String])
        -> Result<Vec<Value>, ScrapeError>;
}
