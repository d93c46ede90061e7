use std::io;

use async_trait::async_trait;

/// Raw table content as handed out by a [`TableStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableContent {
    Bytes(Vec<u8>),
    Text(String),
}

impl TableContent {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            TableContent::Bytes(bytes) => bytes,
            TableContent::Text(text) => text.into_bytes(),
        }
    }

    pub fn into_text(self) -> io::Result<String> {
        match self {
            TableContent::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
            }
            TableContent::Text(text) => Ok(text),
        }
    }
}

/// Named-table storage backend. Decoding is not the store's concern; see
/// [`crate::storage::tables`].
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn has(&self, name: &str) -> io::Result<bool>;

    /// Returns the stored content, as raw bytes when `as_bytes` is set and as UTF-8 text otherwise.
    async fn get(&self, name: &str, as_bytes: bool) -> io::Result<TableContent>;

    async fn set(&self, name: &str, content: TableContent) -> io::Result<()>;
}
