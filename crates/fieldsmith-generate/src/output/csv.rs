use std::io::Write;

use fieldsmith_core::RowValues;

use super::CountingWriter;
use crate::errors::GenerationError;

/// Write rows as CSV with one column per name in `columns`, in that order.
///
/// A column missing from a row is written as an empty cell.
pub fn write_rows_csv<W: Write>(
    writer: W,
    columns: &[String],
    rows: &[RowValues],
) -> Result<u64, GenerationError> {
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(columns)?;
    for row in rows {
        let record = columns
            .iter()
            .map(|column| row.get(column).map(String::as_str).unwrap_or_default());
        writer.write_record(record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}
