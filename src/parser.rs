//! LinkedIn export CSV parser.
//!
//! Handles the CSV files inside an extracted export. Headers are taken
//! as-is from each file since LinkedIn has changed column sets between
//! export generations; rows are normalized to the header width and
//! nothing beyond UTF-8 and CSV framing is validated here.
//!
//! `Connections.csv` is special: LinkedIn prepends a short prose notice
//! ahead of the header row, which must be skipped line-wise before CSV
//! parsing starts.

use crate::error::LixError;
use crate::model::{RecordBatch, RecordKind};
use anyhow::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lines of prose before the header row in `Connections.csv`.
const CONNECTIONS_PREAMBLE_LINES: usize = 3;

/// Parser for the CSV files inside an extracted LinkedIn export.
pub struct ExportParser {
    export_root: PathBuf,
}

impl ExportParser {
    pub fn new(export_root: impl AsRef<Path>) -> Self {
        Self {
            export_root: export_root.as_ref().to_path_buf(),
        }
    }

    /// Parse the CSV file for `kind`, if present.
    ///
    /// Returns `Ok(None)` when the file does not exist in the export.
    /// An existing file that holds only a header (or nothing at all)
    /// parses to an empty batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or if a
    /// row is not valid UTF-8 CSV.
    pub fn parse(&self, kind: RecordKind) -> Result<Option<RecordBatch>> {
        let preamble = match kind {
            RecordKind::Connections => CONNECTIONS_PREAMBLE_LINES,
            _ => 0,
        };
        self.read_csv(kind.file_name(), preamble)
    }

    fn read_csv(&self, file_name: &str, preamble_lines: usize) -> Result<Option<RecordBatch>> {
        let path = self.export_root.join(file_name);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{file_name} not present in export");
                return Ok(None);
            }
            Err(e) => return Err(LixError::path_error("open", &path, e).into()),
        };

        let mut reader = BufReader::new(file);
        for _ in 0..preamble_lines {
            let mut skipped = String::new();
            let read = reader
                .read_line(&mut skipped)
                .map_err(|e| LixError::path_error("read", &path, e))?;
            if read == 0 {
                // File ends inside the preamble: nothing to parse.
                return Ok(Some(RecordBatch::default()));
            }
        }

        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()
            .map_err(|e| LixError::parse_error(file_name, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut batch = RecordBatch::new(columns);
        for record in csv_reader.records() {
            let record = record.map_err(|e| LixError::parse_error(file_name, e.to_string()))?;
            batch.push_row(record.iter().map(str::to_string).collect());
        }

        debug!("Parsed {} rows from {file_name}", batch.len());
        Ok(Some(batch))
    }
}
