use thiserror::Error;

/// Failure of a single target scrape or a single batch chunk.
///
/// None of these abort a run; the orchestrators record them and move on.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network-level failure (DNS, timeout, connection reset, unreadable body)
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("no property information found in embedded data for {url}")]
    ResolutionNotFound { url: String },

    #[error("search API request failed: {0}")]
    SearchApi(String),

    #[error("failed to persist result: {0:#}")]
    Persist(anyhow::Error),
}

impl ScrapeError {
    /// Short machine-friendly label, used in run summaries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Fetch { .. } => "fetch",
            ScrapeError::HttpStatus { .. } => "http_status",
            ScrapeError::ResolutionNotFound { .. } => "not_found",
            ScrapeError::SearchApi(_) => "search_api",
            ScrapeError::Persist(_) => "persist",
        }
    }
}
