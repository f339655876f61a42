//! Routing tree: one file per area.

use axum::routing::{get, post};
use axum::Router;

pub mod jobs;
pub mod mcp;
pub mod system;
pub mod workflows;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route(
            "/api/worlds/:world_id/jobs",
            post(jobs::create).get(jobs::list),
        )
        .route("/api/jobs/:job_id", get(jobs::status))
        .route("/api/workflows", get(workflows::list_types))
        .route(
            "/api/worlds/:world_id/workflows/:workflow_type",
            post(workflows::start),
        )
        .route(
            "/api/workflows/instances/:instance_id",
            get(workflows::instance),
        )
        .merge(mcp::router())
}
