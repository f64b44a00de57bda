use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::model::GenerationResult;

pub mod csv;
pub mod json;

pub use self::csv::write_rows_csv;
pub use self::json::write_rows_json;

/// Serialization format for generated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(GenerationError::invalid_options(format!(
                "unsupported output format '{other}' (expected csv or json)"
            ))),
        }
    }
}

/// Write generated rows to `writer`; returns the number of bytes written.
pub fn write_rows<W: Write>(
    writer: W,
    format: OutputFormat,
    result: &GenerationResult,
) -> Result<u64, GenerationError> {
    match format {
        OutputFormat::Csv => write_rows_csv(writer, &result.field_order, &result.rows),
        OutputFormat::Json => write_rows_json(writer, &result.field_order, &result.rows),
    }
}

/// Write generated rows to a file, replacing it.
pub fn write_rows_to_path(
    path: &Path,
    format: OutputFormat,
    result: &GenerationResult,
) -> Result<u64, GenerationError> {
    let writer = BufWriter::new(File::create(path)?);
    write_rows(writer, format, result)
}

/// Counts bytes passed through to the inner writer.
pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
