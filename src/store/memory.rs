//! In-memory collaborators for orchestrator tests

use crate::models::{ScrapeResult, ScrapeTarget, TargetRef};
use crate::store::{BatchDocument, BatchStore, Registry};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryRegistry {
    targets: Mutex<Vec<ScrapeTarget>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryRegistry {
    pub fn with_urls(urls: &[&str]) -> Self {
        let targets = urls
            .iter()
            .map(|url| ScrapeTarget::new(*url))
            .collect();
        Self {
            targets: Mutex::new(targets),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, url: &str) -> Option<ScrapeTarget> {
        self.targets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.url == url)
            .cloned()
    }

    /// URLs written, in write order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn list_targets(&self) -> Result<Vec<TargetRef>> {
        Ok(self
            .targets
            .lock()
            .unwrap()
            .iter()
            .map(|t| TargetRef {
                url: t.url.clone(),
                title: t.title.clone(),
            })
            .collect())
    }

    async fn upsert_result(&self, url: &str, result: ScrapeResult) -> Result<()> {
        self.writes.lock().unwrap().push(url.to_string());
        let mut targets = self.targets.lock().unwrap();
        match targets.iter_mut().find(|t| t.url == url) {
            Some(target) => {
                target.status = result.status;
                target.information = result.information;
            }
            None => targets.push(ScrapeTarget {
                status: result.status,
                information: result.information,
                ..ScrapeTarget::new(url)
            }),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBatchStore {
    docs: Mutex<HashMap<BatchDocument, Vec<Value>>>,
}

#[async_trait]
impl BatchStore for MemoryBatchStore {
    async fn read(&self, doc: BatchDocument) -> Result<Vec<Value>> {
        Ok(self.docs.lock().unwrap().get(&doc).cloned().unwrap_or_default())
    }

    async fn append(&self, doc: BatchDocument, records: Vec<Value>) -> Result<usize> {
        let mut docs = self.docs.lock().unwrap();
        let entry = docs.entry(doc).or_default();
        entry.extend(records);
        Ok(entry.len())
    }
}
