//! Collaborator adapters: the target registry, batch output documents, and
//! the single-instance run lock.

pub mod batch;
pub mod lock;
#[cfg(test)]
pub mod memory;
pub mod registry;

use crate::models::{ScrapeResult, TargetRef};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tokio::fs;

pub use batch::JsonFileBatchStore;
pub use lock::RunLock;
pub use registry::JsonFileRegistry;

/// The external list of targets to scrape
#[async_trait]
pub trait Registry: Send + Sync {
    async fn list_targets(&self) -> Result<Vec<TargetRef>>;

    /// Overwrite status and information for `url`, inserting it if unknown
    async fn upsert_result(&self, url: &str, result: ScrapeResult) -> Result<()>;
}

/// Named JSON array documents produced by the bulk path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchDocument {
    RentalIds,
    Listings,
}

impl BatchDocument {
    pub fn file_name(&self) -> &'static str {
        match self {
            BatchDocument::RentalIds => "rental_ids.json",
            BatchDocument::Listings => "listings.json",
        }
    }
}

/// Durable append-only output for the bulk path
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn read(&self, doc: BatchDocument) -> Result<Vec<Value>>;

    /// Append records to the end of the document, returning its new length
    async fn append(&self, doc: BatchDocument, records: Vec<Value>) -> Result<usize>;
}

/// Read a JSON document, treating a missing file as `None`
pub(crate) async fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !fs::try_exists(path)
        .await
        .with_context(|| format!("Failed to check {}", path.display()))?
    {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let parsed = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(parsed))
}

/// Rewrite a JSON document whole, via a temp file and rename
pub(crate) async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    fs::write(temp_path, json)
        .await
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    fs::rename(temp_path, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}
