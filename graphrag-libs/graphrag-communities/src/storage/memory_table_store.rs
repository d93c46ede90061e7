use std::{collections::HashMap, io};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::table_store::{TableContent, TableStore};

#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: RwLock<HashMap<String, TableContent>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn has(&self, name: &str) -> io::Result<bool> {
        Ok(self.tables.read().await.contains_key(name))
    }

    async fn get(&self, name: &str, as_bytes: bool) -> io::Result<TableContent> {
        let content = self
            .tables
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", name)))?;

        if as_bytes {
            Ok(TableContent::Bytes(content.into_bytes()))
        } else {
            Ok(TableContent::Text(content.into_text()?))
        }
    }

    async fn set(&self, name: &str, content: TableContent) -> io::Result<()> {
        self.tables.write().await.insert(name.to_string(), content);
        Ok(())
    }
}
