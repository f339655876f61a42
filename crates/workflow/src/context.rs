//! Per-instance workflow state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use worldforge_core::{WorkflowInstanceId, WorldId};

use crate::error::WorkflowError;
use crate::journal::{JournalEntry, JournalRecord};

/// A job dispatch requested by a workflow step.
///
/// Requests accumulate in the context while a handler runs; the engine
/// drains and submits them (scoped to the workflow's world) after the
/// handler returns. Deferred submission keeps `initialize` trivially free of
/// side effects and gives each step exclusive ownership of the context for
/// its entire run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub executor_name: String,
    pub layer: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

/// The live state of one workflow instance.
///
/// Exclusively owned by that instance; the engine is the sole mutator, and
/// handlers only touch it through the operations below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    instance_id: WorkflowInstanceId,
    world_id: WorldId,
    /// Immutable input mapping established at initialization.
    parameters: BTreeMap<String, String>,
    /// Free-form milestone label; also the terminal-state marker.
    status: String,
    /// Append-only audit trail.
    journal: Vec<JournalEntry>,
    /// Dispatch requests pending submission by the engine. Not persisted:
    /// the engine drains them before every store write.
    #[serde(skip)]
    pending: Vec<JobRequest>,
}

impl WorkflowContext {
    pub fn new(
        instance_id: WorkflowInstanceId,
        world_id: WorldId,
        parameters: BTreeMap<String, String>,
        initial_status: impl Into<String>,
    ) -> Self {
        Self {
            instance_id,
            world_id,
            parameters,
            status: initial_status.into(),
            journal: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn instance_id(&self) -> WorkflowInstanceId {
        self.instance_id
    }

    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    /// The immutable initialization parameters.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Current milestone label.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Set the current milestone label. Used both for human-readable
    /// progress and as the terminal-state marker.
    pub fn update_workflow_status(&mut self, label: impl Into<String>) {
        self.status = label.into();
    }

    /// Request a job dispatch, scoped to this workflow's world. Delegates to
    /// the job service's `create_job` once the current step returns.
    pub fn enqueue_job(
        &mut self,
        executor_name: impl Into<String>,
        layer: Option<String>,
        parameters: BTreeMap<String, String>,
    ) {
        self.pending.push(JobRequest {
            executor_name: executor_name.into(),
            layer,
            parameters,
        });
    }

    /// Append a record to the audit trail.
    pub fn add_record<R: JournalRecord>(&mut self, record: &R) {
        self.journal
            .push(JournalEntry::new(R::RECORD_TYPE, record.encode()));
    }

    /// Decode the most recent journal record of type `R`, if any.
    pub fn find_record<R: JournalRecord>(&self) -> Result<Option<R>, WorkflowError> {
        self.journal
            .iter()
            .rev()
            .find(|e| e.record_type == R::RECORD_TYPE)
            .map(|e| R::decode(&e.value))
            .transpose()
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Take the accumulated dispatch requests. Engine-internal.
    pub(crate) fn drain_pending(&mut self) -> Vec<JobRequest> {
        std::mem::take(&mut self.pending)
    }
}
