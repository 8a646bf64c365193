use crate::scrapers::bulk::{BatchConfig, DEFAULT_CHUNK_SIZE};
use crate::scrapers::types::{HttpConfig, DEFAULT_GEO_COOKIE, DEFAULT_USER_AGENT};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "listing-scout")]
#[command(about = "Scrape property listing pages and bulk-fetch listing records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only URLs on this host (www. ignored) are scraped
    #[arg(
        long,
        env = "SCOUT_ALLOWED_HOST",
        default_value = "apartmentlist.com",
        global = true
    )]
    pub allowed_host: String,

    /// JSON file holding the scrape target registry
    #[arg(
        long,
        env = "SCOUT_REGISTRY_PATH",
        default_value = "data/scrape_targets.json",
        global = true
    )]
    pub registry_path: PathBuf,

    /// Directory for bulk output documents
    #[arg(long, env = "SCOUT_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Lock file guarding against concurrent runs [default: <data dir>/.scout.lock]
    #[arg(long, env = "SCOUT_LOCK_PATH", global = true)]
    pub lock_path: Option<PathBuf>,

    #[arg(
        long,
        env = "SCOUT_USER_AGENT",
        default_value = DEFAULT_USER_AGENT,
        global = true
    )]
    pub user_agent: String,

    /// Cookie header sent with every request to pass the geofence check
    #[arg(
        long,
        env = "SCOUT_GEO_COOKIE",
        default_value = DEFAULT_GEO_COOKIE,
        global = true
    )]
    pub geo_cookie: String,

    #[arg(long, env = "SCOUT_HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scrape every eligible target in the registry once
    Scrape {
        /// Seconds between consecutive page requests
        #[arg(long, env = "SCOUT_SCRAPE_DELAY_SECS", default_value_t = 2)]
        delay_secs: u64,
    },
    /// Discover listings on a metro search page and fetch their records
    Bulk {
        /// Metro search page carrying listing pins and the API token
        #[arg(long)]
        metro_url: String,

        #[arg(
            long,
            env = "SCOUT_SEARCH_ENDPOINT",
            default_value = "https://www.apartmentlist.com/api/v2/rentals/search"
        )]
        search_endpoint: String,

        /// Seconds between consecutive chunk requests
        #[arg(long, env = "SCOUT_BATCH_DELAY_SECS", default_value_t = 5)]
        delay_secs: u64,

        #[arg(long, env = "SCOUT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Skip listings and identifiers already present in the output documents
        #[arg(long, env = "SCOUT_DEDUPE_LISTINGS", default_value_t = false)]
        dedupe: bool,
    },
}

impl Cli {
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            user_agent: self.user_agent.clone(),
            geo_cookie: self.geo_cookie.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        self.lock_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(".scout.lock"))
    }
}

impl Commands {
    pub fn batch_config(&self) -> Option<BatchConfig> {
        match self {
            Commands::Bulk {
                chunk_size, dedupe, ..
            } => Some(BatchConfig {
                chunk_size: (*chunk_size).max(1),
                dedupe: *dedupe,
            }),
            Commands::Scrape { .. } => None,
        }
    }
}
