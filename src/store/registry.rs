use crate::models::{ScrapeResult, ScrapeTarget, TargetRef};
use crate::store::{read_json_file, write_json_file, Registry};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Registry kept as a JSON array of [`ScrapeTarget`] records
pub struct JsonFileRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<ScrapeTarget>> {
        Ok(read_json_file(&self.path).await?.unwrap_or_default())
    }
}

#[async_trait]
impl Registry for JsonFileRegistry {
    async fn list_targets(&self) -> Result<Vec<TargetRef>> {
        let targets = self.load().await?;
        Ok(targets
            .into_iter()
            .map(|t| TargetRef {
                url: t.url,
                title: t.title,
            })
            .collect())
    }

    async fn upsert_result(&self, url: &str, result: ScrapeResult) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut targets = self.load().await?;

        match targets.iter_mut().find(|t| t.url == url) {
            Some(target) => {
                target.status = result.status;
                target.information = result.information;
            }
            None => {
                debug!("Registry has no entry for {}, inserting", url);
                targets.push(ScrapeTarget {
                    status: result.status,
                    information: result.information,
                    ..ScrapeTarget::new(url)
                });
            }
        }

        write_json_file(&self.path, &targets).await
    }
}
