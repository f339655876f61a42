//! Workflow error model.

use thiserror::Error;

use worldforge_core::WorkflowInstanceId;
use worldforge_jobs::JobServiceError;

use crate::store::WorkflowStoreError;

/// Workflow-level error.
///
/// `Validation` and `Conflict` are the synchronous, side-effect-free
/// rejections raised during `initialize`; they indicate a caller error and
/// are never retried automatically.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Bad input rejected during `initialize`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Conflicting input (e.g. target already exists) rejected during
    /// `initialize`.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No workflow type registered under that name.
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// A workflow type failed registration-time validation.
    #[error("workflow registration error: {0}")]
    Registration(String),

    #[error("workflow instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),

    /// A journal record could not be decoded, or a step result violated the
    /// data-passing convention.
    #[error("journal error: {0}")]
    Journal(String),

    #[error(transparent)]
    Job(#[from] JobServiceError),

    #[error(transparent)]
    Store(#[from] WorkflowStoreError),
}

impl WorkflowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    pub fn journal(msg: impl Into<String>) -> Self {
        Self::Journal(msg.into())
    }
}
