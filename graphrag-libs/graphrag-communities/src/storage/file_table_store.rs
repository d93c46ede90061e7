use std::{io, path::PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::config::WorkflowConfig;

use super::table_store::{TableContent, TableStore};

/// Stores each table as a file named after the table under `root_dir`.
#[derive(Debug, Clone)]
pub struct FileTableStore {
    root_dir: PathBuf,
}

impl FileTableStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(config.storage_dir.clone())
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }
}

#[async_trait]
impl TableStore for FileTableStore {
    async fn has(&self, name: &str) -> io::Result<bool> {
        fs::try_exists(self.table_path(name)).await
    }

    async fn get(&self, name: &str, as_bytes: bool) -> io::Result<TableContent> {
        let path = self.table_path(name);
        if as_bytes {
            Ok(TableContent::Bytes(fs::read(&path).await?))
        } else {
            Ok(TableContent::Text(fs::read_to_string(&path).await?))
        }
    }

    async fn set(&self, name: &str, content: TableContent) -> io::Result<()> {
        let path = self.table_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content.into_bytes()).await
    }
}
