//! Workflow engine: registration, triggering, and completion dispatch.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, warn};

use worldforge_core::{WorkflowInstanceId, WorldId};
use worldforge_jobs::{Job, JobCompletionListener, JobService, JobStatus};

use crate::context::{JobRequest, WorkflowContext};
use crate::error::WorkflowError;
use crate::store::{WorkflowInstance, WorkflowStore};
use crate::workflow::Workflow;

/// Cooperative terminal label: handlers set it via `update_workflow_status`
/// to complete their workflow.
pub const WORKFLOW_COMPLETED: &str = "COMPLETED";

/// Terminal label stamped by the engine when a dispatched job fails or a
/// handler errors.
pub const WORKFLOW_FAILED: &str = "FAILED";

/// Status label of a freshly initialized instance, before `start` runs.
const INITIAL_STATUS: &str = "initialized";

type ErasedInitialize = Box<
    dyn Fn(WorldId, &BTreeMap<String, String>) -> Result<BTreeMap<String, String>, WorkflowError>
        + Send
        + Sync,
>;
type ErasedStart = Box<dyn Fn(&mut WorkflowContext) -> Result<(), WorkflowError> + Send + Sync>;
type ErasedHandler = Box<
    dyn Fn(&mut WorkflowContext, &BTreeMap<String, String>) -> Result<(), WorkflowError>
        + Send
        + Sync,
>;
type ErasedOnFailure = Box<dyn Fn(&mut WorkflowContext, &str, &str) + Send + Sync>;
type ErasedFinalize = Box<dyn Fn(&mut WorkflowContext, &str) + Send + Sync>;

/// Type-erased dispatch table for one registered workflow type.
struct Registration {
    initialize: ErasedInitialize,
    start: ErasedStart,
    handlers: HashMap<String, ErasedHandler>,
    on_failure: ErasedOnFailure,
    finalize: ErasedFinalize,
}

/// Turns declared workflows into resumable processes.
///
/// Register workflow types once at startup, then attach the engine to the
/// job service as a completion listener. All routing state is explicit:
/// executor-name → handler per type (validated at registration), job id →
/// instance id in the workflow store.
pub struct WorkflowEngine {
    jobs: Arc<JobService>,
    store: Arc<dyn WorkflowStore>,
    registrations: RwLock<HashMap<String, Registration>>,
}

impl WorkflowEngine {
    pub fn new(jobs: Arc<JobService>, store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            jobs,
            store,
            registrations: RwLock::new(HashMap::new()),
        }
    }

    /// Register a workflow type.
    ///
    /// Validates the handler table here, not at first use: duplicate
    /// executor names and handlers bound to executors the registry does not
    /// know are both rejected.
    pub fn register<W: Workflow>(&self, workflow: W) -> Result<(), WorkflowError> {
        let workflow_type = workflow.workflow_type();
        let entries = workflow.handlers().into_entries();

        let mut seen: Vec<&str> = Vec::new();
        for &(executor_name, _) in &entries {
            if seen.contains(&executor_name) {
                return Err(WorkflowError::registration(format!(
                    "workflow {workflow_type} binds executor {executor_name} twice"
                )));
            }
            if !self.jobs.has_executor(executor_name) {
                return Err(WorkflowError::registration(format!(
                    "workflow {workflow_type} binds a handler to unknown executor {executor_name}"
                )));
            }
            seen.push(executor_name);
        }

        let mut registrations = self.registrations.write().unwrap();
        if registrations.contains_key(workflow_type) {
            return Err(WorkflowError::registration(format!(
                "workflow type already registered: {workflow_type}"
            )));
        }

        let workflow = Arc::new(workflow);

        let mut handlers: HashMap<String, ErasedHandler> = HashMap::new();
        for (executor_name, handler) in entries {
            let w = workflow.clone();
            handlers.insert(
                executor_name.to_string(),
                Box::new(move |ctx, data| handler(&w, ctx, data)),
            );
        }

        let registration = Registration {
            initialize: {
                let w = workflow.clone();
                Box::new(move |world_id, raw| w.initialize(world_id, raw))
            },
            start: {
                let w = workflow.clone();
                Box::new(move |ctx| w.start(ctx))
            },
            handlers,
            on_failure: {
                let w = workflow.clone();
                Box::new(move |ctx, executor_name, error| w.on_failure(ctx, executor_name, error))
            },
            finalize: {
                let w = workflow;
                Box::new(move |ctx, status| w.finalize(ctx, status))
            },
        };

        registrations.insert(workflow_type.to_string(), registration);
        info!(workflow_type, "workflow type registered");
        Ok(())
    }

    /// Trigger a new instance of a registered workflow type.
    ///
    /// `initialize` runs first and is pure: on rejection nothing has been
    /// persisted or queued, and the error goes straight back to the caller.
    pub fn start_workflow(
        &self,
        workflow_type: &str,
        world_id: WorldId,
        raw_params: BTreeMap<String, String>,
    ) -> Result<WorkflowInstanceId, WorkflowError> {
        let registrations = self.registrations.read().unwrap();
        let registration = registrations
            .get(workflow_type)
            .ok_or_else(|| WorkflowError::UnknownWorkflowType(workflow_type.to_string()))?;

        let parameters = (registration.initialize)(world_id, &raw_params)?;

        let mut ctx = WorkflowContext::new(
            WorkflowInstanceId::new(),
            world_id,
            parameters,
            INITIAL_STATUS,
        );
        (registration.start)(&mut ctx)?;

        let mut instance = WorkflowInstance::new(workflow_type, ctx);
        let instance_id = instance.id;
        let requests = instance.context.drain_pending();

        self.store.insert(instance.clone())?;

        if let Err(e) = self.submit_requests(&instance, requests) {
            self.fail_instance(registration, &mut instance);
            return Err(e);
        }

        info!(
            workflow_type,
            instance_id = %instance_id,
            world_id = %world_id,
            "workflow started"
        );

        Ok(instance_id)
    }

    /// Read back an instance (status + journal).
    pub fn instance(
        &self,
        id: WorkflowInstanceId,
    ) -> Result<Option<WorkflowInstance>, WorkflowError> {
        Ok(self.store.get(id)?)
    }

    /// Registered workflow type names, sorted for stable presentation.
    pub fn workflow_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.registrations.read().unwrap().keys().cloned().collect();
        types.sort();
        types
    }

    fn is_terminal_label(status: &str) -> bool {
        status == WORKFLOW_COMPLETED || status == WORKFLOW_FAILED
    }

    /// Submit drained job requests, scoped to the instance's world, and bind
    /// the created jobs to the instance for completion routing.
    fn submit_requests(
        &self,
        instance: &WorkflowInstance,
        requests: Vec<JobRequest>,
    ) -> Result<(), WorkflowError> {
        for request in requests {
            let title = format!("{}: {}", instance.workflow_type, request.executor_name);
            let job = self.jobs.create_job(
                instance.world_id,
                &request.executor_name,
                &title,
                request.layer,
                request.parameters,
            )?;
            self.store.bind_job(job.id, instance.id)?;

            debug!(
                instance_id = %instance.id,
                job_id = %job.id,
                executor = %request.executor_name,
                "workflow job dispatched"
            );
        }
        Ok(())
    }

    /// Stamp the failed terminal label and run cleanup. Any dispatch
    /// requests still pending are dropped: a terminal workflow stops.
    fn fail_instance(&self, registration: &Registration, instance: &mut WorkflowInstance) {
        let dropped = instance.context.drain_pending();
        if !dropped.is_empty() {
            warn!(
                instance_id = %instance.id,
                count = dropped.len(),
                "dropping job requests from failed workflow"
            );
        }

        instance.context.update_workflow_status(WORKFLOW_FAILED);
        (registration.finalize)(&mut instance.context, WORKFLOW_FAILED);

        if let Err(e) = self.store.update(instance) {
            error!(instance_id = %instance.id, error = %e, "failed to persist failed workflow");
        }
    }

    /// Route a terminal job to its owning instance's bound handler.
    fn dispatch(&self, job: &Job) -> Result<(), WorkflowError> {
        let Some(instance_id) = self.store.instance_for_job(job.id)? else {
            // Not workflow-owned (e.g. a synchronous-adapter job).
            return Ok(());
        };

        let registrations = self.registrations.read().unwrap();

        let mut instance = self
            .store
            .get(instance_id)?
            .ok_or(WorkflowError::InstanceNotFound(instance_id))?;

        let Some(registration) = registrations.get(&instance.workflow_type) else {
            warn!(
                instance_id = %instance_id,
                workflow_type = %instance.workflow_type,
                "completion for unregistered workflow type"
            );
            return Ok(());
        };

        if Self::is_terminal_label(instance.context.status()) {
            warn!(
                instance_id = %instance_id,
                job_id = %job.id,
                "ignoring job completion for terminal workflow"
            );
            return Ok(());
        }

        match job.status {
            JobStatus::Completed => {
                self.dispatch_completed(registration, &mut instance, job)
            }
            JobStatus::Failed => {
                let error = job.error_message.as_deref().unwrap_or("job failed");
                (registration.on_failure)(&mut instance.context, &job.executor_name, error);
                self.fail_instance(registration, &mut instance);
                Ok(())
            }
            // Non-terminal transitions are never delivered to listeners.
            JobStatus::Pending | JobStatus::Running => Ok(()),
        }
    }

    fn dispatch_completed(
        &self,
        registration: &Registration,
        instance: &mut WorkflowInstance,
        job: &Job,
    ) -> Result<(), WorkflowError> {
        let Some(handler) = registration.handlers.get(&job.executor_name) else {
            debug!(
                instance_id = %instance.id,
                executor = %job.executor_name,
                "no handler bound for completed job"
            );
            return Ok(());
        };

        let result_data = decode_result(job)?;

        if let Err(e) = handler(&mut instance.context, &result_data) {
            warn!(
                instance_id = %instance.id,
                executor = %job.executor_name,
                error = %e,
                "completion handler failed"
            );
            self.fail_instance(registration, instance);
            return Err(e);
        }

        let requests = instance.context.drain_pending();
        if let Err(e) = self.submit_requests(instance, requests) {
            self.fail_instance(registration, instance);
            return Err(e);
        }

        if instance.context.status() == WORKFLOW_COMPLETED {
            (registration.finalize)(&mut instance.context, WORKFLOW_COMPLETED);
            info!(instance_id = %instance.id, "workflow completed");
        }

        self.store.update(instance)?;
        Ok(())
    }
}

impl JobCompletionListener for WorkflowEngine {
    fn on_job_terminal(&self, job: &Job) {
        if let Err(e) = self.dispatch(job) {
            error!(job_id = %job.id, error = %e, "workflow dispatch failed");
        }
    }
}

/// Decode a completed job's stored result string back into the flat mapping
/// handlers receive. A missing payload is an empty mapping.
fn decode_result(job: &Job) -> Result<BTreeMap<String, String>, WorkflowError> {
    match job.result.as_deref() {
        None => Ok(BTreeMap::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| WorkflowError::journal(format!("undecodable job result: {e}"))),
    }
}
