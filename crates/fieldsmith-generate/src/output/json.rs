use std::io::Write;

use fieldsmith_core::RowValues;
use serde_json::{Map, Value};

use super::CountingWriter;
use crate::errors::GenerationError;

/// Write rows as a pretty-printed JSON array of objects keyed in `columns` order.
pub fn write_rows_json<W: Write>(
    writer: W,
    columns: &[String],
    rows: &[RowValues],
) -> Result<u64, GenerationError> {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let record: Map<String, Value> = columns
                .iter()
                .map(|column| {
                    let value = row.get(column).cloned().unwrap_or_default();
                    (column.clone(), Value::String(value))
                })
                .collect();
            Value::Object(record)
        })
        .collect();

    let mut counting = CountingWriter::new(writer);
    serde_json::to_writer_pretty(&mut counting, &records)?;
    counting.write_all(b"\n")?;
    counting.flush()?;
    Ok(counting.bytes_written())
}
