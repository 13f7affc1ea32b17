use ::csv::{Terminator, WriterBuilder};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::datasets::deposits::DepositRecord;
use crate::models::errors::SinkError;
use crate::storage::DepositSink;

/// Append-only CSV event log.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DepositSink for CsvSink {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn append_rows(
        &self,
        rows: &[DepositRecord],
        write_header_if_absent: bool,
    ) -> Result<(), SinkError> {
        let write_header = write_header_if_absent && !self.exists();

        // Serialize everything up front so a bad row never leaves a partial write behind
        let mut writer = WriterBuilder::new()
            .has_headers(write_header)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buffer)?;
        file.flush()?;

        if write_header {
            info!("Created event log file {}", self.path.display());
        }
        debug!("Appended {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}
