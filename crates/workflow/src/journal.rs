//! Workflow journal: an append-only audit trail of milestones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// A persisted journal entry: an opaque, recoverable fact a workflow
/// recorded about its own progress (e.g. the id of a model created by an
/// earlier step, needed again much later).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Discriminator matching a concrete [`JournalRecord`] type.
    pub record_type: String,
    /// The record reduced to its single-string form.
    pub value: String,
    pub recorded_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(record_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            value: value.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// A serializable audit record.
///
/// Each concrete record type reduces itself to a single string for storage
/// and restores itself from that string, so the journal stays a sequence of
/// opaque facts with typed read-back at the point of use.
pub trait JournalRecord: Sized {
    /// Stable discriminator for this record type.
    const RECORD_TYPE: &'static str;

    /// Reduce to the single-string storage form.
    fn encode(&self) -> String;

    /// Restore from the storage form.
    fn decode(value: &str) -> Result<Self, WorkflowError>;
}
