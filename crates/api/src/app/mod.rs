//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: orchestration wiring (registry, job service, engine,
//!   runner, synchronous adapter)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Must be called from within a tokio runtime: the in-process job runner is
/// spawned as part of service wiring.
pub fn build_app() -> Router {
    let services = Arc::new(services::build_services());
    routes::router().layer(ServiceBuilder::new().layer(Extension(services)))
}
