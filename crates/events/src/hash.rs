//! Hash chain for journal integrity

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::record::JournalRecord;

/// `prev_hash` of the first record
pub const GENESIS_HASH: &str = "GENESIS";

/// SHA256 over every field except `hash`
pub fn calculate_record_hash(record: &JournalRecord) -> String {
    let mut hasher = Sha256::new();

    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    hasher.update(record.timestamp.to_rfc3339().as_bytes());
    hasher.update(record.correlation_id.as_bytes());
    hasher.update(format!("{:?}", record.command).as_bytes());

    for event in &record.events {
        hasher.update(format!("{:?}", event).as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Verify links, hashes and sequence numbers of a full journal
pub fn verify_chain(records: &[JournalRecord]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_HASH.to_string();

    for (i, record) in records.iter().enumerate() {
        if record.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: prev_hash,
                actual: record.prev_hash.clone(),
            });
        }

        let calculated = calculate_record_hash(record);
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: record.sequence,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }

        let expected = i as u64 + 1;
        if record.sequence != expected {
            return Err(ChainError::InvalidSequence {
                expected,
                actual: record.sequence,
            });
        }

        prev_hash = record.hash.clone();
    }

    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid sequence: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}
