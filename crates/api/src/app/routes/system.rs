//! System endpoints.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use crate::app::errors::job_service_error_to_response;
use crate::app::services::AppServices;

pub async fn health(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let stats = match services.jobs.stats() {
        Ok(stats) => stats,
        Err(e) => return job_service_error_to_response(e),
    };

    Json(json!({
        "status": "ok",
        "jobs": stats,
    }))
    .into_response()
}
