//! Workflow engine: resumable, multi-step processes over the job subsystem.
//!
//! ## Design
//!
//! - A workflow type declares, once, a handler for each executor name it
//!   cares about; the engine builds the name → handler table at registration
//!   time and validates it there (no duplicates, no handler for an executor
//!   the registry does not know)
//! - `initialize` is pure validation: a submission can be rejected before
//!   anything is persisted or queued
//! - Handlers operate on a per-instance [`WorkflowContext`] (immutable
//!   parameters, free-form status label, append-only journal); job requests
//!   accumulate in the context and are submitted by the engine after the
//!   handler returns, so each step runs to completion before the next job
//!   can even exist
//! - Completion routing is keyed purely by executor name over persisted
//!   context + terminal job state, so a restarted engine can replay
//!   unresolved completions without re-executing finished steps

pub mod catalog;
pub mod composite;
pub mod context;
pub mod engine;
pub mod error;
pub mod journal;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod integration_tests;

pub use catalog::{InMemoryWorldCatalog, WorldCatalog};
pub use composite::{
    CompositeModelRecord, CompositeStructureWorkflow, ASSEMBLE_COMPOSITE_STRUCTURE,
    CREATE_COMPOSITE_MODEL,
};
pub use context::{JobRequest, WorkflowContext};
pub use engine::{WorkflowEngine, WORKFLOW_COMPLETED, WORKFLOW_FAILED};
pub use error::WorkflowError;
pub use journal::{JournalEntry, JournalRecord};
pub use store::{
    InMemoryWorkflowStore, WorkflowInstance, WorkflowStore, WorkflowStoreError,
};
pub use workflow::{CompletionHandler, HandlerTable, Workflow};
