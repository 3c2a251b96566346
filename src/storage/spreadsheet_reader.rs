use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

use crate::models::data_models::HEADER_ALIASES;
use crate::processor::schema::rename_columns;

/// Reads the delimited-text exports of the client, sales and employee sheets.
pub struct SpreadsheetReader;

impl SpreadsheetReader {
    /// Reads an export and maps its source headers onto the canonical column names.
    pub fn read_table(&self, path: &Path, skip_rows: usize) -> Result<DataFrame> {
        let mut df = self.read_raw(path, skip_rows)?;
        let renamed = rename_columns(&mut df, &HEADER_ALIASES)?;

        info!(
            "Read {} rows x {} columns from {} ({} headers mapped)",
            df.height(),
            df.width(),
            path.display(),
            renamed
        );
        Ok(df)
    }

    /// Reads a file exactly as stored, headers included.
    pub fn read_raw(&self, path: &Path, skip_rows: usize) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(skip_rows)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}
