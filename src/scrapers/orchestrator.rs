use crate::error::ScrapeError;
use crate::models::{PropertyInformation, ScrapeResult, TargetRef};
use crate::scrapers::extract::extract_blob;
use crate::scrapers::pacing::Pacer;
use crate::scrapers::resolver;
use crate::scrapers::traits::PageFetcher;
use crate::store::Registry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Lowercase a hostname and drop a leading `www.`
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

/// True when `url` is absolute and its normalized host equals `allowed_host`
pub fn is_allowed_url(url: &str, allowed_host: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(normalize_host))
        .is_some_and(|host| host == normalize_host(allowed_host))
}

#[derive(Debug)]
pub enum TargetOutcome {
    Succeeded { strategy: &'static str },
    Failed(ScrapeError),
    /// Host not allowed; the registry entry was left untouched
    Skipped,
}

#[derive(Debug)]
pub struct TargetReport {
    pub url: String,
    pub outcome: TargetOutcome,
}

/// Result of one full pass over the registry
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: Vec<TargetReport>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Succeeded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TargetOutcome::Skipped))
    }

    fn count(&self, pred: impl Fn(&TargetOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Drives registry -> fetch -> extract -> resolve -> registry for every
/// eligible target, one at a time.
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<dyn Registry>,
    pacer: Arc<dyn Pacer>,
    allowed_host: String,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        registry: Arc<dyn Registry>,
        pacer: Arc<dyn Pacer>,
        allowed_host: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            pacer,
            allowed_host: allowed_host.into(),
        }
    }

    /// Process every target in the registry once.
    ///
    /// Only a failure to read the registry aborts the run; per-target
    /// failures are recorded in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let targets = self
            .registry
            .list_targets()
            .await
            .context("Failed to read scrape targets from registry")?;

        info!("Scraping {} registry targets (allowed host: {})", targets.len(), self.allowed_host);

        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.process_target(&target).await;
            reports.push(TargetReport {
                url: target.url,
                outcome,
            });
        }

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            reports,
        })
    }

    async fn process_target(&self, target: &TargetRef) -> TargetOutcome {
        if !is_allowed_url(&target.url, &self.allowed_host) {
            info!("Skipping {}: host is not {}", target.url, self.allowed_host);
            return TargetOutcome::Skipped;
        }

        self.pacer.wait().await;
        info!(
            "Scraping {} ({})",
            target.url,
            target.title.as_deref().unwrap_or("untitled")
        );

        let (result, outcome) = match self.scrape_target(&target.url).await {
            Ok(info) => {
                let strategy = info.strategy_name();
                info!("✅ {} resolved via {}", target.url, strategy);
                (
                    ScrapeResult::success(info.to_payload()),
                    TargetOutcome::Succeeded { strategy },
                )
            }
            Err(e) => {
                warn!("Scrape of {} failed ({}): {}", target.url, e.kind(), e);
                (ScrapeResult::failed(), TargetOutcome::Failed(e))
            }
        };

        if let Err(e) = self.registry.upsert_result(&target.url, result).await {
            error!("Failed to record result for {}: {:#}", target.url, e);
            return TargetOutcome::Failed(ScrapeError::Persist(e));
        }

        outcome
    }

    /// Fetch, extract and resolve one target without touching the registry
    pub async fn scrape_target(&self, url: &str) -> Result<PropertyInformation, ScrapeError> {
        let page = self.fetcher.fetch_page(url).await?;
        if page.status_code != 200 {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: page.status_code,
            });
        }

        let blob = extract_blob(&page.html);
        if blob.is_empty() {
            debug!("No embedded data element in {}", url);
        }

        resolver::resolve(&blob).ok_or_else(|| ScrapeError::ResolutionNotFound {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScrapeStatus;
    use crate::scrapers::pacing::testing::CountingPacer;
    use crate::scrapers::types::FetchedPage;
    use crate::store::memory::MemoryRegistry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum FakeResponse {
        Page(u16, String),
        NetworkError,
    }

    #[derive(Default)]
    struct FakeFetcher {
        responses: HashMap<String, FakeResponse>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, response: FakeResponse) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch_page(&self, url: &str) -> Result<FetchedPage, ScrapeError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(FakeResponse::Page(status, html)) => Ok(FetchedPage {
                    html: html.clone(),
                    status_code: *status,
                }),
                Some(FakeResponse::NetworkError) | None => Err(ScrapeError::Fetch {
                    url: url.to_string(),
                    source: reqwest::Client::new().get("not a url").build().unwrap_err(),
                }),
            }
        }
    }

    fn page_with_blob(blob: serde_json::Value) -> String {
        format!(
            r#"<html><head><script id="__NEXT_DATA__" type="application/json">{}</script></head><body></body></html>"#,
            blob
        )
    }

    fn valid_page() -> String {
        page_with_blob(json!({
            "props": {"pageProps": {"component": {"searchResult": {
                "listings": [{"id": 1, "name": "The Aster"}],
                "totalResults": 1
            }}}},
            "runtimeConfig": {"al_api_token_desktop": "tok"}
        }))
    }

    fn orchestrator(
        fetcher: Arc<FakeFetcher>,
        registry: Arc<MemoryRegistry>,
        pacer: Arc<CountingPacer>,
    ) -> ScrapeOrchestrator {
        ScrapeOrchestrator::new(fetcher, registry, pacer, "apartmentlist.com")
    }

    const A: &str = "https://www.apartmentlist.com/a";
    const B: &str = "https://www.apartmentlist.com/b";
    const C: &str = "https://example.com/c";

    #[test]
    fn host_normalization() {
        assert!(is_allowed_url("https://WWW.ApartmentList.com/x", "apartmentlist.com"));
        assert!(is_allowed_url("https://apartmentlist.com/x", "www.apartmentlist.com"));
        assert!(!is_allowed_url("https://example.com/x", "apartmentlist.com"));
        assert!(!is_allowed_url("https://cdn.apartmentlist.com/x", "apartmentlist.com"));
        assert!(!is_allowed_url("/relative/path", "apartmentlist.com"));
    }

    #[tokio::test]
    async fn mixed_registry_end_to_end() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with(A, FakeResponse::Page(200, valid_page()))
                .with(B, FakeResponse::Page(404, "not found".to_string())),
        );
        let registry = Arc::new(MemoryRegistry::with_urls(&[A, B, C]));
        let pacer = Arc::new(CountingPacer::default());

        let summary = orchestrator(fetcher.clone(), registry.clone(), pacer.clone())
            .run()
            .await
            .unwrap();

        assert_eq!((summary.succeeded(), summary.failed(), summary.skipped()), (1, 1, 1));

        let a = registry.get(A).unwrap();
        assert_eq!(a.status, ScrapeStatus::Success);
        assert_eq!(
            a.information,
            Some(json!({
                "listings": [{"id": 1, "name": "The Aster"}],
                "apiToken": "tok",
                "totalResults": 1
            }))
        );

        let b = registry.get(B).unwrap();
        assert_eq!(b.status, ScrapeStatus::Failed);
        assert!(b.information.is_none());

        let c = registry.get(C).unwrap();
        assert_eq!(c.status, ScrapeStatus::None);

        assert_eq!(fetcher.requested(), vec![A.to_string(), B.to_string()]);
        assert_eq!(registry.writes(), vec![A.to_string(), B.to_string()]);
        assert_eq!(pacer.calls(), 2);
    }

    #[tokio::test]
    async fn disallowed_hosts_are_never_written() {
        let fetcher = Arc::new(FakeFetcher::default());
        let registry = Arc::new(MemoryRegistry::with_urls(&[C, "not-a-url", "https://zillow.com/x"]));
        let pacer = Arc::new(CountingPacer::default());

        let summary = orchestrator(fetcher.clone(), registry.clone(), pacer.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.skipped(), 3);
        assert!(registry.writes().is_empty());
        assert!(fetcher.requested().is_empty());
        assert_eq!(pacer.calls(), 0);
    }

    #[tokio::test]
    async fn non_200_fails_even_with_valid_blob() {
        let fetcher =
            Arc::new(FakeFetcher::default().with(A, FakeResponse::Page(503, valid_page())));
        let registry = Arc::new(MemoryRegistry::with_urls(&[A]));
        let summary = orchestrator(fetcher, registry.clone(), Arc::new(CountingPacer::default()))
            .run()
            .await
            .unwrap();

        assert!(matches!(
            summary.reports[0].outcome,
            TargetOutcome::Failed(ScrapeError::HttpStatus { status: 503, .. })
        ));
        assert_eq!(registry.get(A).unwrap().status, ScrapeStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_blob_shape_fails_resolution() {
        let html = page_with_blob(json!({"props": {"pageProps": {"unrelated": true}}}));
        let fetcher = Arc::new(FakeFetcher::default().with(A, FakeResponse::Page(200, html)));
        let registry = Arc::new(MemoryRegistry::with_urls(&[A]));
        let summary = orchestrator(fetcher, registry.clone(), Arc::new(CountingPacer::default()))
            .run()
            .await
            .unwrap();

        assert!(matches!(
            summary.reports[0].outcome,
            TargetOutcome::Failed(ScrapeError::ResolutionNotFound { .. })
        ));
        assert_eq!(registry.get(A).unwrap().status, ScrapeStatus::Failed);
    }

    #[tokio::test]
    async fn page_without_blob_fails_resolution() {
        let html = "<html><body>Access denied</body></html>".to_string();
        let fetcher = Arc::new(FakeFetcher::default().with(A, FakeResponse::Page(200, html)));
        let registry = Arc::new(MemoryRegistry::with_urls(&[A]));
        let orchestrator =
            orchestrator(fetcher, registry, Arc::new(CountingPacer::default()));

        let err = orchestrator.scrape_target(A).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn network_error_does_not_abort_run() {
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with(A, FakeResponse::NetworkError)
                .with(B, FakeResponse::Page(200, valid_page())),
        );
        let registry = Arc::new(MemoryRegistry::with_urls(&[A, B]));
        let summary = orchestrator(fetcher, registry.clone(), Arc::new(CountingPacer::default()))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(registry.get(A).unwrap().status, ScrapeStatus::Failed);
        assert_eq!(registry.get(B).unwrap().status, ScrapeStatus::Success);
    }

    #[tokio::test]
    async fn rerun_produces_identical_payloads() {
        let fetcher = Arc::new(FakeFetcher::default().with(A, FakeResponse::Page(200, valid_page())));
        let registry = Arc::new(MemoryRegistry::with_urls(&[A]));
        let orchestrator =
            orchestrator(fetcher, registry.clone(), Arc::new(CountingPacer::default()));

        orchestrator.run().await.unwrap();
        let first = registry.get(A).unwrap();
        orchestrator.run().await.unwrap();
        let second = registry.get(A).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.status, ScrapeStatus::Success);
    }

    #[tokio::test]
    async fn failed_target_recovers_on_later_run() {
        let registry = Arc::new(MemoryRegistry::with_urls(&[A]));

        let failing = Arc::new(FakeFetcher::default().with(A, FakeResponse::Page(500, String::new())));
        orchestrator(failing, registry.clone(), Arc::new(CountingPacer::default()))
            .run()
            .await
            .unwrap();
        assert_eq!(registry.get(A).unwrap().status, ScrapeStatus::Failed);

        let healthy = Arc::new(FakeFetcher::default().with(A, FakeResponse::Page(200, valid_page())));
        orchestrator(healthy, registry.clone(), Arc::new(CountingPacer::default()))
            .run()
            .await
            .unwrap();
        assert_eq!(registry.get(A).unwrap().status, ScrapeStatus::Success);
    }
}
