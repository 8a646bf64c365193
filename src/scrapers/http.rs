use crate::error::ScrapeError;
use crate::scrapers::traits::{PageFetcher, SearchApi};
use crate::scrapers::types::{FetchedPage, HttpConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION, COOKIE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

fn build_client(config: &HttpConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&config.geo_cookie).context("Invalid geofence cookie value")?,
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .build()
        .context("Failed to create HTTP client")
}

/// Plain GET fetcher carrying the geofence cookies
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
        debug!("Fetching URL: {}", url);

        let fetch_err = |source: reqwest::Error| ScrapeError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status_code = response.status().as_u16();
        let html = response.text().await.map_err(fetch_err)?;

        debug!("Downloaded {} bytes of HTML (status {})", html.len(), status_code);

        Ok(FetchedPage { html, status_code })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    listings: Vec<Value>,
}

/// Client for the token-authenticated listing search endpoint
pub struct HttpSearchApi {
    client: Client,
    endpoint: Url,
}

impl HttpSearchApi {
    pub fn new(config: &HttpConfig, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid search endpoint: {}", endpoint))?;
        Ok(Self {
            client: build_client(config)?,
            endpoint,
        })
    }

    fn request_url(&self, rental_ids: &[String]) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(Some(&format!("rental_ids={}", rental_ids.join(","))));
        url
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn fetch_listings(
        &self,
        token: &str,
        rental_ids: &[String],
    ) -> Result<Vec<Value>, ScrapeError> {
        let url = self.request_url(rental_ids);
        debug!("Requesting {} listings from {}", rental_ids.len(), self.endpoint);

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Token token={}", token))
            .send()
            .await
            .map_err(|source| ScrapeError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::SearchApi(format!(
                "endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::SearchApi(format!("undecodable response body: {}", e)))?;

        Ok(body.listings)
    }
}
