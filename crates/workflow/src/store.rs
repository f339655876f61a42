//! Workflow instance storage.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use worldforge_core::{JobId, WorkflowInstanceId, WorldId};

use crate::context::WorkflowContext;

/// Persisted state of one workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: WorkflowInstanceId,
    pub workflow_type: String,
    pub world_id: WorldId,
    pub context: WorkflowContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    pub fn new(workflow_type: impl Into<String>, context: WorkflowContext) -> Self {
        let now = Utc::now();
        Self {
            id: context.instance_id(),
            workflow_type: workflow_type.into(),
            world_id: context.world_id(),
            context,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Workflow store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowStoreError {
    #[error("workflow instance not found: {0}")]
    NotFound(WorkflowInstanceId),
    #[error("workflow instance already exists: {0}")]
    AlreadyExists(WorkflowInstanceId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Persistence for workflow instances and the job → instance index the
/// engine routes completions through.
///
/// Instances are never deleted by the core; retention is an external
/// concern.
pub trait WorkflowStore: Send + Sync {
    fn insert(&self, instance: WorkflowInstance) -> Result<(), WorkflowStoreError>;

    fn get(&self, id: WorkflowInstanceId) -> Result<Option<WorkflowInstance>, WorkflowStoreError>;

    fn update(&self, instance: &WorkflowInstance) -> Result<(), WorkflowStoreError>;

    /// Bind a dispatched job to the instance that owns it.
    fn bind_job(
        &self,
        job_id: JobId,
        instance_id: WorkflowInstanceId,
    ) -> Result<(), WorkflowStoreError>;

    /// The instance owning a job, if the job was dispatched by a workflow.
    fn instance_for_job(
        &self,
        job_id: JobId,
    ) -> Result<Option<WorkflowInstanceId>, WorkflowStoreError>;
}

/// In-memory workflow store for dev/test and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    instances: RwLock<HashMap<WorkflowInstanceId, WorkflowInstance>>,
    job_index: RwLock<HashMap<JobId, WorkflowInstanceId>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn insert(&self, instance: WorkflowInstance) -> Result<(), WorkflowStoreError> {
        let mut instances = self.instances.write().unwrap();
        if instances.contains_key(&instance.id) {
            return Err(WorkflowStoreError::AlreadyExists(instance.id));
        }
        instances.insert(instance.id, instance);
        Ok(())
    }

    fn get(&self, id: WorkflowInstanceId) -> Result<Option<WorkflowInstance>, WorkflowStoreError> {
        let instances = self.instances.read().unwrap();
        Ok(instances.get(&id).cloned())
    }

    fn update(&self, instance: &WorkflowInstance) -> Result<(), WorkflowStoreError> {
        let mut instances = self.instances.write().unwrap();
        if !instances.contains_key(&instance.id) {
            return Err(WorkflowStoreError::NotFound(instance.id));
        }
        let mut updated = instance.clone();
        updated.updated_at = Utc::now();
        instances.insert(updated.id, updated);
        Ok(())
    }

    fn bind_job(
        &self,
        job_id: JobId,
        instance_id: WorkflowInstanceId,
    ) -> Result<(), WorkflowStoreError> {
        self.job_index.write().unwrap().insert(job_id, instance_id);
        Ok(())
    }

    fn instance_for_job(
        &self,
        job_id: JobId,
    ) -> Result<Option<WorkflowInstanceId>, WorkflowStoreError> {
        Ok(self.job_index.read().unwrap().get(&job_id).copied())
    }
}
