//! Bulk path: discover rental ids on a metro search page, then pull full
//! listing records from the search API in paced batches.

use crate::error::ScrapeError;
use crate::models::ListingPin;
use crate::scrapers::extract::extract_blob;
use crate::scrapers::pacing::Pacer;
use crate::scrapers::resolver::{lookup, API_TOKEN_PATH, SEARCH_RESULT_PATH};
use crate::scrapers::traits::{PageFetcher, SearchApi};
use crate::store::{BatchDocument, BatchStore};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 20;

fn parse_blob(blob: &str) -> Option<Value> {
    match serde_json::from_str(blob) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Embedded data is not valid JSON: {}", e);
            None
        }
    }
}

/// Listing pins from a metro search page. Pins without a rental id are dropped.
pub fn extract_identifiers(blob: &str) -> Vec<ListingPin> {
    let Some(root) = parse_blob(blob) else {
        return Vec::new();
    };

    let Some(pins) = lookup(&root, SEARCH_RESULT_PATH)
        .and_then(|result| result.get("listingPins"))
        .and_then(Value::as_array)
    else {
        warn!("No listing pins in embedded data");
        return Vec::new();
    };

    pins.iter()
        .filter_map(|pin| match serde_json::from_value::<ListingPin>(pin.clone()) {
            Ok(pin) => Some(pin),
            Err(e) => {
                warn!("Dropping listing pin {} without usable rentalId: {}", pin, e);
                None
            }
        })
        .collect()
}

/// The search API token embedded in the page's runtime config
pub fn extract_token(blob: &str) -> Option<String> {
    let root = parse_blob(blob)?;
    let token = lookup(&root, API_TOKEN_PATH)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if token.is_none() {
        warn!("No API token in embedded data");
    }
    token
}

/// Split `items` into consecutive groups of `size`; the last may be shorter
pub fn chunk_ids<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn digits_of(value: &Value) -> Option<String> {
    let digits: String = match value {
        Value::String(s) => s.chars().filter(char::is_ascii_digit).collect(),
        Value::Number(n) => n.to_string().chars().filter(char::is_ascii_digit).collect(),
        _ => return None,
    };
    Some(digits).filter(|d| !d.is_empty())
}

fn is_digit_value(value: &Value) -> bool {
    match value {
        Value::String(s) => is_all_digits(s),
        Value::Number(n) => n.is_u64(),
        _ => false,
    }
}

/// Rewrite sub-unit `name`/`display_name` values that are not all digits to
/// the digits of the parent unit's `remote_listing_id`. Returns the number of
/// fields rewritten.
pub fn normalize_listing(listing: &mut Value) -> usize {
    let Some(groups) = listing
        .get_mut("available_units")
        .and_then(Value::as_array_mut)
    else {
        return 0;
    };

    let mut rewritten = 0;
    for group in groups {
        let parent_digits = group.get("remote_listing_id").and_then(digits_of);
        let Some(units) = group.get_mut("units").and_then(Value::as_array_mut) else {
            continue;
        };

        for unit in units {
            let Some(fields) = unit.as_object_mut() else {
                continue;
            };
            let replacement = parent_digits
                .clone()
                .or_else(|| fields.get("remote_listing_id").and_then(digits_of));

            for field in ["name", "display_name"] {
                if fields.get(field).is_some_and(is_digit_value) {
                    continue;
                }
                match &replacement {
                    Some(digits) => {
                        fields.insert(field.to_string(), Value::String(digits.clone()));
                        rewritten += 1;
                    }
                    None => warn!(
                        "Sub-unit {} {:?} is not numeric and no remote_listing_id digits are available",
                        field,
                        fields.get(field)
                    ),
                }
            }
        }
    }
    rewritten
}

/// Identity used for duplicate suppression in the listings document
fn listing_key(listing: &Value) -> Option<String> {
    ["rental_id", "id"]
        .iter()
        .find_map(|key| listing.get(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub chunk_size: usize,
    /// Skip records already present in the store instead of appending again
    pub dedupe: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            dedupe: false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub identifiers_discovered: usize,
    pub chunks: usize,
    pub chunks_failed: usize,
    pub listings_appended: usize,
    pub duplicates_skipped: usize,
    pub fields_normalized: usize,
}

/// Fetches listing records by rental id, chunk by chunk, and appends them to
/// the batch store
pub struct BatchFetcher {
    api: Arc<dyn SearchApi>,
    store: Arc<dyn BatchStore>,
    pacer: Arc<dyn Pacer>,
    config: BatchConfig,
}

impl BatchFetcher {
    pub fn new(
        api: Arc<dyn SearchApi>,
        store: Arc<dyn BatchStore>,
        pacer: Arc<dyn Pacer>,
        config: BatchConfig,
    ) -> Self {
        Self {
            api,
            store,
            pacer,
            config,
        }
    }

    /// Discover ids and token from `metro_url`, persist the ids, then fetch
    /// all listings.
    pub async fn run_from_search_page(
        &self,
        fetcher: &dyn PageFetcher,
        metro_url: &str,
    ) -> Result<BatchSummary> {
        info!("Discovering listings from {}", metro_url);
        let page = fetcher.fetch_page(metro_url).await?;
        if page.status_code != 200 {
            return Err(ScrapeError::HttpStatus {
                url: metro_url.to_string(),
                status: page.status_code,
            }
            .into());
        }

        let blob = extract_blob(&page.html);
        let pins = extract_identifiers(&blob);
        let Some(token) = extract_token(&blob) else {
            bail!("No API token found on {}", metro_url);
        };
        info!("Discovered {} listing identifiers", pins.len());

        self.record_identifiers(&pins).await?;

        let rental_ids: Vec<String> = pins.into_iter().map(|p| p.rental_id).collect();
        let mut summary = self.run(&token, &rental_ids).await?;
        summary.identifiers_discovered = rental_ids.len();
        Ok(summary)
    }

    async fn record_identifiers(&self, pins: &[ListingPin]) -> Result<()> {
        let mut pins: Vec<&ListingPin> = pins.iter().collect();
        if self.config.dedupe {
            let existing = self.store.read(BatchDocument::RentalIds).await?;
            let seen: HashSet<&str> = existing
                .iter()
                .filter_map(|v| v.get("rentalId").and_then(Value::as_str))
                .collect();
            pins.retain(|p| !seen.contains(p.rental_id.as_str()));
        }

        let records = pins
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let total = self
            .store
            .append(BatchDocument::RentalIds, records)
            .await
            .context("Failed to store discovered identifiers")?;
        debug!("Identifier document now holds {} entries", total);
        Ok(())
    }

    /// Fetch every id in chunks, pacing between chunk requests. A failed chunk
    /// is logged and counted; later chunks still run.
    pub async fn run(&self, token: &str, rental_ids: &[String]) -> Result<BatchSummary> {
        let chunks = chunk_ids(rental_ids, self.config.chunk_size);
        let mut summary = BatchSummary {
            chunks: chunks.len(),
            ..Default::default()
        };

        let mut seen: HashSet<String> = if self.config.dedupe {
            self.store
                .read(BatchDocument::Listings)
                .await?
                .iter()
                .filter_map(listing_key)
                .collect()
        } else {
            HashSet::new()
        };

        info!(
            "Fetching {} listings in {} chunks of up to {}",
            rental_ids.len(),
            chunks.len(),
            self.config.chunk_size
        );

        for (index, chunk) in chunks.iter().enumerate() {
            self.pacer.wait().await;
            match self.fetch_chunk(token, chunk, &mut seen, &mut summary).await {
                Ok(appended) => info!(
                    "Chunk {}/{}: appended {} listings",
                    index + 1,
                    chunks.len(),
                    appended
                ),
                Err(e) => {
                    warn!("Chunk {}/{} failed: {:#}", index + 1, chunks.len(), e);
                    summary.chunks_failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn fetch_chunk(
        &self,
        token: &str,
        chunk: &[String],
        seen: &mut HashSet<String>,
        summary: &mut BatchSummary,
    ) -> Result<usize> {
        let mut listings = self.api.fetch_listings(token, chunk).await?;

        for listing in listings.iter_mut() {
            summary.fields_normalized += normalize_listing(listing);
        }

        if self.config.dedupe {
            let before = listings.len();
            listings.retain(|listing| match listing_key(listing) {
                Some(key) => seen.insert(key),
                None => true,
            });
            summary.duplicates_skipped += before - listings.len();
        }

        let appended = listings.len();
        self.store
            .append(BatchDocument::Listings, listings)
            .await
            .map_err(ScrapeError::Persist)?;
        summary.listings_appended += appended;
        Ok(appended)
    }
}
