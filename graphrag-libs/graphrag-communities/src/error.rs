use std::io;

use polars::error::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableStoreError {
    #[error("Could not find {name} in storage")]
    MissingTable { name: String },
    #[error("Unknown file extension for {name}")]
    UnsupportedFormat { name: String },
    #[error("Error decoding table {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: PolarsError,
    },
    #[error("Error encoding table {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: PolarsError,
    },
    #[error("Storage error for {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl TableStoreError {
    pub fn table_name(&self) -> &str {
        match self {
            TableStoreError::MissingTable { name }
            | TableStoreError::UnsupportedFormat { name }
            | TableStoreError::Decode { name, .. }
            | TableStoreError::Encode { name, .. }
            | TableStoreError::Storage { name, .. } => name,
        }
    }
}
