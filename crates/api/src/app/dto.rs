//! Request/response DTOs and JSON mapping helpers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use worldforge_jobs::{ExecutionStatus, Job, JobExecutionResult, JobStatus};
use worldforge_workflow::WorkflowInstance;

/// Poll path for a job id, shared by every response that hands one out.
pub fn job_poll_path(job_id: impl std::fmt::Display) -> String {
    format!("/api/jobs/{job_id}")
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub executor: String,
    pub title: Option<String>,
    pub layer: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Tool-call request. `worldId` is required by the world-in-body route
/// group and ignored by the world-in-path group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    pub executor: String,
    pub world_id: Option<String>,
    pub layer: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub timeout_seconds: Option<u64>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct JobCreatedResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub poll_path: String,
}

impl JobCreatedResponse {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            poll_path: job_poll_path(job.id),
        }
    }
}

/// Job status as returned by the polling endpoint: terminal and non-terminal
/// outcomes are distinct shapes, distinguishable by the `status` tag alone.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatusResponse {
    Pending {
        job_id: String,
        executor: String,
        title: String,
        poll_path: String,
    },
    Running {
        job_id: String,
        executor: String,
        title: String,
        started_at: Option<DateTime<Utc>>,
        poll_path: String,
    },
    Completed {
        job_id: String,
        executor: String,
        title: String,
        result: Option<String>,
        duration_ms: Option<u64>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    },
    Failed {
        job_id: String,
        executor: String,
        title: String,
        error_message: Option<String>,
        duration_ms: Option<u64>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    },
}

impl JobStatusResponse {
    pub fn from_job(job: &Job) -> Self {
        let job_id = job.id.to_string();
        let executor = job.executor_name.clone();
        let title = job.title.clone();
        let duration_ms = job
            .duration()
            .and_then(|d| d.num_milliseconds().try_into().ok());

        match job.status {
            JobStatus::Pending => Self::Pending {
                poll_path: job_poll_path(&job_id),
                job_id,
                executor,
                title,
            },
            JobStatus::Running => Self::Running {
                poll_path: job_poll_path(&job_id),
                started_at: job.started_at,
                job_id,
                executor,
                title,
            },
            JobStatus::Completed => Self::Completed {
                result: job.result.clone(),
                duration_ms,
                started_at: job.started_at,
                completed_at: job.completed_at,
                job_id,
                executor,
                title,
            },
            JobStatus::Failed => Self::Failed {
                error_message: job.error_message.clone(),
                duration_ms,
                started_at: job.started_at,
                completed_at: job.completed_at,
                job_id,
                executor,
                title,
            },
        }
    }
}

/// Tool-call outcome: exactly one of three unambiguous shapes.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolCallResponse {
    Completed {
        job_id: String,
        result: Option<String>,
        duration_ms: Option<u64>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    },
    Failed {
        job_id: String,
        error_message: Option<String>,
        duration_ms: Option<u64>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    },
    /// The bounded wait elapsed; the job keeps running. Callers reattach
    /// through `poll_path`.
    Running {
        job_id: String,
        message: String,
        poll_path: String,
    },
}

impl ToolCallResponse {
    pub fn from_result(result: &JobExecutionResult) -> Self {
        match result.status {
            ExecutionStatus::Success => Self::Completed {
                job_id: result.job_id.to_string(),
                result: result.result.clone(),
                duration_ms: result.duration_ms,
                started_at: result.started_at,
                completed_at: result.completed_at,
            },
            ExecutionStatus::Failure => Self::Failed {
                job_id: result.job_id.to_string(),
                error_message: result.error_message.clone(),
                duration_ms: result.duration_ms,
                started_at: result.started_at,
                completed_at: result.completed_at,
            },
        }
    }

    pub fn still_running(job_id: impl std::fmt::Display) -> Self {
        Self::Running {
            job_id: job_id.to_string(),
            message: "job is still running; poll for the result".to_string(),
            poll_path: job_poll_path(job_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowStartedResponse {
    pub instance_id: String,
    pub status_path: String,
}

#[derive(Debug, Serialize)]
pub struct JournalEntryView {
    pub record_type: String,
    pub value: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowInstanceResponse {
    pub instance_id: String,
    pub workflow_type: String,
    pub world_id: String,
    pub status: String,
    pub parameters: BTreeMap<String, String>,
    pub journal: Vec<JournalEntryView>,
}

impl WorkflowInstanceResponse {
    pub fn from_instance(instance: &WorkflowInstance) -> Self {
        Self {
            instance_id: instance.id.to_string(),
            workflow_type: instance.workflow_type.clone(),
            world_id: instance.world_id.to_string(),
            status: instance.context.status().to_string(),
            parameters: instance.context.parameters().clone(),
            journal: instance
                .context
                .journal()
                .iter()
                .map(|e| JournalEntryView {
                    record_type: e.record_type.clone(),
                    value: e.value.clone(),
                    recorded_at: e.recorded_at,
                })
                .collect(),
        }
    }
}
