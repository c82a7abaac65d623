//! JSONL journal reader - sequential reader for replay

use crate::error::EventError;
use crate::record::JournalRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reads journal files in name (date) order
pub struct JournalReader {
    files: Vec<PathBuf>,
}

impl JournalReader {
    /// Reader over every `.jsonl` file in `path`; a missing directory is an empty journal
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if file_path.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        files.sort();
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Read all records from all files in order
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, EventError> {
        let mut records = Vec::new();

        for file_path in &self.files {
            let reader = BufReader::new(File::open(file_path)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: JournalRecord = serde_json::from_str(&line).map_err(|e| {
                    EventError::InvalidFile(format!(
                        "{}:{}: {}",
                        file_path.display(),
                        line_no + 1,
                        e
                    ))
                })?;
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Last record, for chaining the next append
    pub fn last_record(&self) -> Result<Option<JournalRecord>, EventError> {
        Ok(self.read_all()?.pop())
    }

    /// Count records across all files
    pub fn count(&self) -> Result<usize, EventError> {
        let mut count = 0;
        for file_path in &self.files {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines() {
                if !line?.trim().is_empty() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}
