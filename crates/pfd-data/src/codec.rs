//! Decompression and CSV parsing of raw survey files.

use crate::error::{DataError, Result};
use flate2::read::GzDecoder;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::{Cursor, Read};
use tracing::debug;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether `bytes` start with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// Decompress gzip input; anything else is returned unchanged.
pub fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !is_gzip(bytes) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 4);
    decoder.read_to_end(&mut out)?;
    debug!(
        compressed = bytes.len(),
        decompressed = out.len(),
        "decompressed gzip input"
    );
    Ok(Cow::Owned(out))
}

/// Parse CSV bytes (with a header row) into a DataFrame.
///
/// Column types are inferred from every row, so a decimal late in an
/// otherwise integer column still yields a float column.
pub fn parse_csv(bytes: &[u8]) -> Result<DataFrame> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DataError::Parse("empty CSV input".to_string()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    debug!(rows = df.height(), columns = df.width(), "parsed CSV");
    Ok(df)
}
