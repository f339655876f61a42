//! Tool-call endpoints for MCP-style RPC callers.
//!
//! Two route groups are served over the same synchronous adapter, an
//! in-progress topology migration: the generator group takes the world id in
//! the request body, the control group takes it in the path. Responses are
//! identical across groups — one of three unambiguous shapes (completed,
//! failed, still-running acknowledgment with a poll path).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use worldforge_core::WorldId;
use worldforge_jobs::SyncExecutionError;

use crate::app::dto::{ToolCallRequest, ToolCallResponse, ToolListResponse};
use crate::app::errors::{invalid_world_id, json_error, sync_error_to_response};
use crate::app::services::AppServices;

/// Caller-facing cap on the bounded wait, enforced at this boundary (the
/// adapter itself accepts any timeout).
const MAX_TIMEOUT: Duration = Duration::from_secs(600);

pub fn router() -> Router {
    Router::new()
        .route("/generator/mcp/execute", post(execute_world_in_body))
        .route("/generator/mcp/tools", get(tools))
        .route("/control/mcp/worlds/:world_id/execute", post(execute_world_in_path))
        .route("/control/mcp/tools", get(tools))
}

/// Generator group: world id travels in the request body.
pub async fn execute_world_in_body(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<ToolCallRequest>,
) -> axum::response::Response {
    let Some(raw_world) = req.world_id.clone() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "worldId is required",
        );
    };

    let Ok(world_id) = raw_world.parse::<WorldId>() else {
        return invalid_world_id(&raw_world);
    };

    run_tool(&services, world_id, req).await
}

/// Control group: world id travels in the path.
pub async fn execute_world_in_path(
    Extension(services): Extension<Arc<AppServices>>,
    Path(world_id): Path<String>,
    Json(req): Json<ToolCallRequest>,
) -> axum::response::Response {
    let Ok(world_id) = world_id.parse::<WorldId>() else {
        return invalid_world_id(&world_id);
    };

    run_tool(&services, world_id, req).await
}

/// Tool discovery: the registry's executor names.
pub async fn tools(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    Json(ToolListResponse {
        tools: services.jobs.registry().names(),
    })
    .into_response()
}

async fn run_tool(
    services: &AppServices,
    world_id: WorldId,
    req: ToolCallRequest,
) -> axum::response::Response {
    let mut builder = services
        .sync
        .execution()
        .world_id(world_id)
        .executor(&req.executor)
        .parameters(req.parameters);

    if let Some(layer) = req.layer {
        builder = builder.layer(layer);
    }

    if let Some(seconds) = req.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds).min(MAX_TIMEOUT));
    }

    let execution = match builder.build() {
        Ok(execution) => execution,
        Err(e) => return sync_error_to_response(e),
    };

    match execution.execute_and_wait().await {
        Ok(result) => Json(ToolCallResponse::from_result(&result)).into_response(),
        Err(SyncExecutionError::Timeout { job_id }) => (
            StatusCode::ACCEPTED,
            Json(ToolCallResponse::still_running(job_id)),
        )
            .into_response(),
        Err(e) => sync_error_to_response(e),
    }
}
