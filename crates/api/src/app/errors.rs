//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use worldforge_jobs::{JobServiceError, SyncExecutionError};
use worldforge_workflow::WorkflowError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn job_service_error_to_response(err: JobServiceError) -> axum::response::Response {
    match err {
        JobServiceError::UnknownExecutor(name) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_executor",
            format!("no executor registered under: {name}"),
        ),
        JobServiceError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job: {id}"))
        }
        JobServiceError::AlreadyTerminal { .. } => {
            json_error(StatusCode::CONFLICT, "conflict", err.to_string())
        }
        JobServiceError::Store(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        JobServiceError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
    }
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        WorkflowError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        WorkflowError::UnknownWorkflowType(name) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_workflow_type",
            format!("no workflow type registered under: {name}"),
        ),
        WorkflowError::InstanceNotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("workflow instance: {id}"))
        }
        WorkflowError::Job(e) => job_service_error_to_response(e),
        WorkflowError::Registration(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "registration_error", msg)
        }
        WorkflowError::Journal(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "journal_error", msg)
        }
        WorkflowError::Store(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

/// Maps adapter errors other than the timeout outcome, which the tool-call
/// handlers turn into the still-running acknowledgment instead.
pub fn sync_error_to_response(err: SyncExecutionError) -> axum::response::Response {
    match err {
        SyncExecutionError::MissingWorldId | SyncExecutionError::MissingExecutor => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        SyncExecutionError::UnknownExecutor(name) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_executor",
            format!("no executor registered under: {name}"),
        ),
        SyncExecutionError::JobVanished { job_id } => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "job_vanished",
            format!("job {job_id} disappeared while polling"),
        ),
        SyncExecutionError::Timeout { job_id } => {
            // Callers of this mapper should have handled timeout already.
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "timeout",
                format!("timed out waiting for job {job_id}"),
            )
        }
        SyncExecutionError::Service(e) => job_service_error_to_response(e),
    }
}

pub fn invalid_world_id(raw: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_world_id",
        format!("not a world id: {raw}"),
    )
}
