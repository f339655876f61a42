//! Observability: logging/tracing initialization for worldforge processes.

mod tracing_init;

pub use tracing_init::init;
