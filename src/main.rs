mod config;
mod error;
mod models;
mod scrapers;
mod store;

use anyhow::Context;
use clap::Parser;
use config::{Cli, Commands};
use scrapers::{
    BatchFetcher, FixedIntervalPacer, HttpPageFetcher, HttpSearchApi, ScrapeOrchestrator,
    TargetOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use store::{JsonFileBatchStore, JsonFileRegistry, RunLock};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_scout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let _lock = RunLock::acquire(cli.lock_path())?;
    let http = cli.http_config();
    let fetcher = Arc::new(HttpPageFetcher::new(&http)?);

    match &cli.command {
        Commands::Scrape { delay_secs } => {
            let registry = Arc::new(JsonFileRegistry::new(&cli.registry_path));
            info!("🏠 Listing Scout - scraping targets from {}", registry.path().display());

            let orchestrator = ScrapeOrchestrator::new(
                fetcher,
                registry,
                Arc::new(FixedIntervalPacer::new(Duration::from_secs(*delay_secs))),
                cli.allowed_host.clone(),
            );
            let summary = orchestrator.run().await?;

            for report in &summary.reports {
                match &report.outcome {
                    TargetOutcome::Succeeded { strategy } => {
                        debug!("  {} resolved via {}", report.url, strategy)
                    }
                    TargetOutcome::Failed(e) => warn!("  ❌ {} [{}]: {}", report.url, e.kind(), e),
                    TargetOutcome::Skipped => {}
                }
            }
            info!(
                "✅ Run finished in {}s: {} succeeded, {} failed, {} skipped",
                (summary.finished_at - summary.started_at).num_seconds(),
                summary.succeeded(),
                summary.failed(),
                summary.skipped()
            );
        }
        Commands::Bulk {
            metro_url,
            search_endpoint,
            delay_secs,
            ..
        } => {
            let store = Arc::new(JsonFileBatchStore::new(&cli.data_dir));
            info!("🏠 Listing Scout - bulk fetch into {}", store.dir().display());

            let batch_config = cli
                .command
                .batch_config()
                .context("Bulk command has no batch configuration")?;
            let batch = BatchFetcher::new(
                Arc::new(HttpSearchApi::new(&http, search_endpoint)?),
                store,
                Arc::new(FixedIntervalPacer::new(Duration::from_secs(*delay_secs))),
                batch_config,
            );
            let summary = batch.run_from_search_page(fetcher.as_ref(), metro_url).await?;

            info!(
                "✅ Bulk run finished: {} identifiers, {}/{} chunks ok, {} listings appended ({} duplicates skipped, {} unit names normalized)",
                summary.identifiers_discovered,
                summary.chunks - summary.chunks_failed,
                summary.chunks,
                summary.listings_appended,
                summary.duplicates_skipped,
                summary.fields_normalized
            );
        }
    }

    Ok(())
}
