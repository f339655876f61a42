//! Job submission and status endpoints.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use worldforge_core::{JobId, WorldId};

use crate::app::dto::{CreateJobRequest, JobCreatedResponse, JobStatusResponse};
use crate::app::errors::{invalid_world_id, job_service_error_to_response, json_error};
use crate::app::services::AppServices;

/// Submit a job. Returns immediately with the job id and a poll path; the
/// unknown-executor case fails before anything is persisted.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Path(world_id): Path<String>,
    Json(req): Json<CreateJobRequest>,
) -> axum::response::Response {
    let Ok(world_id) = world_id.parse::<WorldId>() else {
        return invalid_world_id(&world_id);
    };

    let title = req.title.unwrap_or_else(|| req.executor.clone());

    match services
        .jobs
        .create_job(world_id, &req.executor, &title, req.layer, req.parameters)
    {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(JobCreatedResponse::from_job(&job)),
        )
            .into_response(),
        Err(e) => job_service_error_to_response(e),
    }
}

/// Poll a job. Idempotent; the response shape alone distinguishes the
/// terminal and non-terminal outcomes.
pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_job_id",
            format!("not a job id: {job_id}"),
        );
    };

    match services.jobs.get_job(job_id) {
        Ok(Some(job)) => Json(JobStatusResponse::from_job(&job)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", format!("job: {job_id}")),
        Err(e) => job_service_error_to_response(e),
    }
}

const LIST_LIMIT: usize = 100;

/// List a world's jobs, oldest first.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Path(world_id): Path<String>,
) -> axum::response::Response {
    let Ok(world_id) = world_id.parse::<WorldId>() else {
        return invalid_world_id(&world_id);
    };

    match services.jobs.list_jobs(world_id, LIST_LIMIT) {
        Ok(jobs) => {
            let views: Vec<JobStatusResponse> =
                jobs.iter().map(JobStatusResponse::from_job).collect();
            Json(views).into_response()
        }
        Err(e) => job_service_error_to_response(e),
    }
}
