//! JSONL journal store - append-only writer

use chrono::{DateTime, Utc};
use pegbank_ledger::LedgerEvent;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::EventError;
use crate::hash::{calculate_record_hash, GENESIS_HASH};
use crate::reader::JournalReader;
use crate::record::{Command, JournalRecord};

/// Append-only journal, one file per UTC day
pub struct JournalStore {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    last_sequence: u64,
    last_hash: String,
}

impl JournalStore {
    /// Open (or create) the journal at `base_path` and continue its chain
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let (last_sequence, last_hash) = match JournalReader::from_directory(&base_path)?.last_record()? {
            Some(record) => (record.sequence, record.hash),
            None => (0, GENESIS_HASH.to_string()),
        };

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
            last_sequence,
            last_hash,
        })
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Seal a record onto the chain and write it
    pub fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        correlation_id: impl Into<String>,
        command: Command,
        events: Vec<LedgerEvent>,
    ) -> Result<JournalRecord, EventError> {
        let mut record = JournalRecord {
            sequence: self.last_sequence + 1,
            prev_hash: self.last_hash.clone(),
            hash: String::new(),
            timestamp,
            correlation_id: correlation_id.into(),
            command,
            events,
        };
        record.hash = calculate_record_hash(&record);

        self.write(&record)?;
        self.last_sequence = record.sequence;
        self.last_hash = record.hash.clone();

        tracing::debug!(
            sequence = record.sequence,
            command = %record.command,
            "Journal record appended"
        );
        Ok(record)
    }

    fn write(&mut self, record: &JournalRecord) -> Result<(), EventError> {
        let date = record.timestamp.format("%Y-%m-%d").to_string();

        // Rotate file if date changed
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        Ok(())
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
