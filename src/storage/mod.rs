pub mod csv;

use crate::models::datasets::deposits::DepositRecord;
use crate::models::errors::SinkError;

/// Durable, append-only destination for deposit rows.
///
/// Implementations are not synchronized; concurrent writers to one destination must be
/// serialized by the caller.
pub trait DepositSink: Send + Sync {
    fn exists(&self) -> bool;

    fn append_rows(
        &self,
        rows: &[DepositRecord],
        write_header_if_absent: bool,
    ) -> Result<(), SinkError>;
}

/// Appends `records` to `sink`, writing the header only when the destination is new.
///
/// An empty batch is a no-op and does not create the destination. Rows are never
/// deduplicated: writing the same batch twice stores it twice.
pub fn write_records<K: DepositSink + ?Sized>(
    sink: &K,
    records: &[DepositRecord],
) -> Result<usize, SinkError> {
    if records.is_empty() {
        return Ok(0);
    }

    let write_header = !sink.exists();
    sink.append_rows(records, write_header)?;
    Ok(records.len())
}
