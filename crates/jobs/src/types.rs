//! The job record and its state machine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use worldforge_core::{JobId, WorldId};

/// Job execution status.
///
/// `Pending` and `Running` are non-terminal; `Completed` and `Failed` are
/// terminal and immutable once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Persisted, waiting to be picked up by the execution mechanism.
    Pending,
    /// Claimed by the execution mechanism.
    Running,
    /// Finished successfully; `result` holds the executor's payload.
    Completed,
    /// Finished unsuccessfully; `error_message` holds the reason.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The atomic unit of asynchronous work.
///
/// Created by the job service on submission; mutated only through the
/// transition methods the service exposes to the execution mechanism.
/// Consumers (workflow engine, synchronous adapter) treat it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID (opaque to callers).
    pub id: JobId,
    /// The world this job belongs to.
    pub world_id: WorldId,
    /// Name of the executor that must process this job.
    pub executor_name: String,
    /// Human-readable title.
    pub title: String,
    /// Optional layer scoping hint, passed through to the executor.
    pub layer: Option<String>,
    /// Executor inputs.
    pub parameters: BTreeMap<String, String>,
    /// Current status.
    pub status: JobStatus,
    /// Result payload produced on success (executor-specific; the core does
    /// not interpret it).
    pub result: Option<String>,
    /// Error payload produced on failure.
    pub error_message: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Set on the transition out of `Pending`.
    pub started_at: Option<DateTime<Utc>>,
    /// Set on the transition into a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new job in `Pending` state.
    pub fn new(
        world_id: WorldId,
        executor_name: impl Into<String>,
        title: impl Into<String>,
        layer: Option<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            world_id,
            executor_name: executor_name.into(),
            title: title.into(),
            layer,
            parameters,
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark the job as running. No-op timestamp-wise if already started.
    pub(crate) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    /// Mark the job as completed with a serialized result payload.
    ///
    /// Stamps `started_at` if the execution mechanism never reported the
    /// running transition, so the timestamp invariants hold by construction.
    pub(crate) fn mark_completed(&mut self, result: String) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.result = Some(result);
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.completed_at = Some(now);
    }

    /// Mark the job as failed with an error message.
    pub(crate) fn mark_failed(&mut self, error_message: String) {
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message);
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.completed_at = Some(now);
    }

    /// Wall-clock execution duration, present only once both timestamps are
    /// set (i.e. the job is terminal).
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }

    /// Timestamp/status consistency: `completed_at` is set iff the status is
    /// terminal, `started_at` is set iff the status is not `Pending`.
    pub fn timestamps_consistent(&self) -> bool {
        self.completed_at.is_some() == self.status.is_terminal()
            && self.started_at.is_some() == (self.status != JobStatus::Pending)
    }
}
