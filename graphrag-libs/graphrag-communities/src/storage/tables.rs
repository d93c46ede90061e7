use std::io::Cursor;

use polars::{
    error::PolarsResult,
    frame::DataFrame,
    prelude::{
        CsvReadOptions, CsvWriter, DataType, JsonFormat, JsonReader, JsonWriter, NamedFrom, ParquetReader,
        ParquetWriter, SerReader, SerWriter,
    },
    series::Series,
};
use tracing::{error, info};

use crate::error::TableStoreError;

use super::table_store::{TableContent, TableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    /// A single JSON array of records, not line-delimited.
    Json,
    Csv,
}

impl TableFormat {
    /// Picks the format from the text after the last `.` of a table name.
    pub fn from_table_name(name: &str) -> Option<Self> {
        match name.rsplit('.').next() {
            Some("parquet") => Some(TableFormat::Parquet),
            Some("json") => Some(TableFormat::Json),
            Some("csv") => Some(TableFormat::Csv),
            _ => None,
        }
    }

    fn reads_as_bytes(&self) -> bool {
        !matches!(self, TableFormat::Json)
    }
}

pub async fn load_table_from_storage(
    name: &str,
    store: &dyn TableStore,
) -> Result<DataFrame, TableStoreError> {
    let exists = store.has(name).await.map_err(|source| TableStoreError::Storage {
        name: name.to_string(),
        source,
    })?;
    if !exists {
        return Err(TableStoreError::MissingTable { name: name.to_string() });
    }

    info!("read table from storage: {}", name);
    let Some(format) = TableFormat::from_table_name(name) else {
        error!("Unknown file extension for {}", name);
        return Err(TableStoreError::UnsupportedFormat { name: name.to_string() });
    };

    let content = store
        .get(name, format.reads_as_bytes())
        .await
        .map_err(|source| {
            error!("error loading table from storage: {}: {}", name, source);
            TableStoreError::Storage {
                name: name.to_string(),
                source,
            }
        })?;

    decode_table(format, content).map_err(|source| {
        error!("error loading table from storage: {}: {}", name, source);
        TableStoreError::Decode {
            name: name.to_string(),
            source,
        }
    })
}

pub async fn write_table_to_storage(
    name: &str,
    df: &mut DataFrame,
    store: &dyn TableStore,
) -> Result<(), TableStoreError> {
    let Some(format) = TableFormat::from_table_name(name) else {
        error!("Unknown file extension for {}", name);
        return Err(TableStoreError::UnsupportedFormat { name: name.to_string() });
    };

    let content = encode_table(format, df).map_err(|source| {
        error!("error encoding table {}: {}", name, source);
        TableStoreError::Encode {
            name: name.to_string(),
            source,
        }
    })?;

    info!("write table to storage: {} ({} rows)", name, df.height());
    store.set(name, content).await.map_err(|source| {
        error!("error writing table to storage: {}: {}", name, source);
        TableStoreError::Storage {
            name: name.to_string(),
            source,
        }
    })
}

pub fn decode_table(format: TableFormat, content: TableContent) -> PolarsResult<DataFrame> {
    let reader = Cursor::new(content.into_bytes());
    match format {
        TableFormat::Parquet => ParquetReader::new(reader).finish(),
        // polars cannot infer a schema from zero records.
        TableFormat::Json if is_empty_json_array(reader.get_ref()) => Ok(DataFrame::empty()),
        TableFormat::Json => JsonReader::new(reader).with_json_format(JsonFormat::Json).finish(),
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(reader)
            .finish(),
    }
}

fn is_empty_json_array(bytes: &[u8]) -> bool {
    let mut significant = bytes.iter().filter(|b| !b.is_ascii_whitespace());
    matches!(
        (significant.next(), significant.next(), significant.next()),
        (Some(b'['), Some(b']'), None)
    )
}

pub fn encode_table(format: TableFormat, df: &mut DataFrame) -> PolarsResult<TableContent> {
    let mut buffer: Vec<u8> = Vec::new();
    match format {
        TableFormat::Parquet => {
            ParquetWriter::new(&mut buffer).finish(df)?;
        }
        TableFormat::Json => {
            JsonWriter::new(&mut buffer).with_json_format(JsonFormat::Json).finish(df)?;
        }
        TableFormat::Csv => {
            let mut flattened = stringify_list_columns(df)?;
            CsvWriter::new(&mut buffer).include_header(true).finish(&mut flattened)?;
        }
    }
    Ok(TableContent::Bytes(buffer))
}

/// CSV has no nested types, so list cells are written as JSON array strings.
fn stringify_list_columns(df: &DataFrame) -> PolarsResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|series| match series.dtype() {
            DataType::List(_) => list_to_json_strings(series),
            _ => Ok(series.clone()),
        })
        .collect::<PolarsResult<Vec<Series>>>()?;

    DataFrame::new(columns)
}

fn list_to_json_strings(series: &Series) -> PolarsResult<Series> {
    let values = series
        .list()?
        .into_iter()
        .map(|item| match item {
            Some(inner) => {
                let inner = inner.cast(&DataType::String)?;
                let values: Vec<&str> = inner.str()?.into_iter().flatten().collect();
                Ok(Some(serde_json::to_string(&values).unwrap_or_default()))
            }
            None => Ok(None),
        })
        .collect::<PolarsResult<Vec<Option<String>>>>()?;

    Ok(Series::new(series.name(), values))
}
