//! Workflow trigger and instance endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use worldforge_core::{WorkflowInstanceId, WorldId};

use crate::app::dto::{WorkflowInstanceResponse, WorkflowStartedResponse};
use crate::app::errors::{invalid_world_id, json_error, workflow_error_to_response};
use crate::app::services::AppServices;

/// Trigger a workflow. Validation runs synchronously and side-effect-free,
/// so a rejection carries an immediately actionable error and leaves no
/// state behind.
pub async fn start(
    Extension(services): Extension<Arc<AppServices>>,
    Path((world_id, workflow_type)): Path<(String, String)>,
    Json(raw_params): Json<BTreeMap<String, String>>,
) -> axum::response::Response {
    let Ok(world_id) = world_id.parse::<WorldId>() else {
        return invalid_world_id(&world_id);
    };

    match services
        .engine
        .start_workflow(&workflow_type, world_id, raw_params)
    {
        Ok(instance_id) => (
            StatusCode::ACCEPTED,
            Json(WorkflowStartedResponse {
                instance_id: instance_id.to_string(),
                status_path: format!("/api/workflows/instances/{instance_id}"),
            }),
        )
            .into_response(),
        Err(e) => workflow_error_to_response(e),
    }
}

/// Read back an instance: status label, parameters, and journal.
pub async fn instance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(instance_id): Path<String>,
) -> axum::response::Response {
    let Ok(instance_id) = instance_id.parse::<WorkflowInstanceId>() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_instance_id",
            format!("not a workflow instance id: {instance_id}"),
        );
    };

    match services.engine.instance(instance_id) {
        Ok(Some(instance)) => {
            Json(WorkflowInstanceResponse::from_instance(&instance)).into_response()
        }
        Ok(None) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("workflow instance: {instance_id}"),
        ),
        Err(e) => workflow_error_to_response(e),
    }
}

/// Registered workflow type names.
pub async fn list_types(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    Json(json!({ "workflows": services.engine.workflow_types() })).into_response()
}
