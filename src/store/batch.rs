use crate::store::{read_json_file, write_json_file, BatchDocument, BatchStore};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Batch documents stored as whole JSON arrays under one directory
pub struct JsonFileBatchStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileBatchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn document_path(&self, doc: BatchDocument) -> PathBuf {
        self.dir.join(doc.file_name())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl BatchStore for JsonFileBatchStore {
    async fn read(&self, doc: BatchDocument) -> Result<Vec<Value>> {
        Ok(read_json_file(&self.document_path(doc))
            .await?
            .unwrap_or_default())
    }

    async fn append(&self, doc: BatchDocument, records: Vec<Value>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut existing = self.read(doc).await?;
        existing.extend(records);
        write_json_file(&self.document_path(doc), &existing).await?;
        Ok(existing.len())
    }
}
