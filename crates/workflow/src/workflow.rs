//! Workflow contract (framework only, no business rules).
//!
//! A workflow is a declared sequence of job dispatches and completion
//! reactions. Implementors define:
//! - pure validation of the raw trigger input (`initialize`)
//! - the first dispatch (`start`)
//! - a declarative handler table keyed by executor name — the engine builds
//!   its routing from it once, at registration time; workflow authors never
//!   hand-write executor-name comparisons
//! - optional failure and cleanup hooks

use std::collections::BTreeMap;

use worldforge_core::WorldId;

use crate::context::WorkflowContext;
use crate::error::WorkflowError;

/// A completion reaction: plain function over the workflow value, its
/// context, and the completed job's flat result mapping.
pub type CompletionHandler<W> =
    fn(&W, &mut WorkflowContext, &BTreeMap<String, String>) -> Result<(), WorkflowError>;

/// Declarative executor-name → handler table for one workflow type.
///
/// Built in [`Workflow::handlers`]; validated (duplicates, dangling names)
/// when the workflow type is registered with the engine, not at first use.
pub struct HandlerTable<W> {
    entries: Vec<(&'static str, CompletionHandler<W>)>,
}

impl<W> HandlerTable<W> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind `handler` to completions of jobs with the given executor name.
    pub fn on(mut self, executor_name: &'static str, handler: CompletionHandler<W>) -> Self {
        self.entries.push((executor_name, handler));
        self
    }

    pub(crate) fn into_entries(self) -> Vec<(&'static str, CompletionHandler<W>)> {
        self.entries
    }
}

impl<W> Default for HandlerTable<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// A multi-step, resumable process composed of job dispatches and
/// completion-triggered handlers.
pub trait Workflow: Send + Sync + Sized + 'static {
    /// Stable workflow type name, used to trigger instances.
    fn workflow_type(&self) -> &'static str;

    /// Validate the raw trigger input and produce the instance's immutable
    /// parameters.
    ///
    /// Must be free of side effects: a submission is rejected here before
    /// anything is persisted or queued. Bad input, an already-existing
    /// target, or a disabled prerequisite all surface as [`WorkflowError`]s
    /// from this method.
    fn initialize(
        &self,
        world_id: WorldId,
        raw_params: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, WorkflowError>;

    /// The first job dispatch.
    fn start(&self, ctx: &mut WorkflowContext) -> Result<(), WorkflowError>;

    /// The completion handler table for this workflow type.
    fn handlers(&self) -> HandlerTable<Self>;

    /// Invoked when a dispatched job fails. Default is a no-op.
    fn on_failure(&self, _ctx: &mut WorkflowContext, _executor_name: &str, _error: &str) {}

    /// Invoked exactly once when the workflow reaches a terminal status,
    /// for cleanup. Default is a no-op.
    fn finalize(&self, _ctx: &mut WorkflowContext, _status: &str) {}
}
