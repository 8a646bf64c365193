use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Cookies the listing site checks before serving US-only pages
pub const DEFAULT_GEO_COOKIE: &str =
    "geo_country=US; geo_region=CA; al_visitor_geo=US; al_geofence_ok=true";

/// Settings for the outbound HTTP client
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Sent verbatim as the `Cookie` header on every request
    pub geo_cookie: String,
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            geo_cookie: DEFAULT_GEO_COOKIE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Raw result of a page fetch. Non-2xx statuses are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub status_code: u16,
}
