//! Composite structure workflow.
//!
//! Two-step generation process: create the composite model, then assemble
//! the structure from it in the world. The model id produced by step one is
//! journaled because step two (and any later maintenance) needs it after the
//! job that produced it is long gone.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use worldforge_core::WorldId;
use worldforge_jobs::PREVIOUS_JOB_RESULT;

use crate::catalog::WorldCatalog;
use crate::context::WorkflowContext;
use crate::engine::WORKFLOW_COMPLETED;
use crate::error::WorkflowError;
use crate::journal::JournalRecord;
use crate::workflow::{HandlerTable, Workflow};

/// Executor that produces the composite model.
pub const CREATE_COMPOSITE_MODEL: &str = "createCompositeModel";

/// Executor that assembles the structure from the model.
pub const ASSEMBLE_COMPOSITE_STRUCTURE: &str = "assembleCompositeStructure";

/// The generator this workflow depends on being enabled.
const PREREQUISITE_GENERATOR: &str = "composite";

/// Journal record: the model id produced by the create step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeModelRecord {
    pub model_id: String,
}

impl JournalRecord for CompositeModelRecord {
    const RECORD_TYPE: &'static str = "composite_model";

    fn encode(&self) -> String {
        self.model_id.clone()
    }

    fn decode(value: &str) -> Result<Self, WorkflowError> {
        if value.is_empty() {
            return Err(WorkflowError::journal("empty composite model record"));
        }
        Ok(Self {
            model_id: value.to_string(),
        })
    }
}

/// Drives composite structure generation in a world.
pub struct CompositeStructureWorkflow {
    catalog: Arc<dyn WorldCatalog>,
}

impl CompositeStructureWorkflow {
    pub fn new(catalog: Arc<dyn WorldCatalog>) -> Self {
        Self { catalog }
    }

    fn model_created(
        &self,
        ctx: &mut WorkflowContext,
        result: &BTreeMap<String, String>,
    ) -> Result<(), WorkflowError> {
        let model_id = result
            .get(PREVIOUS_JOB_RESULT)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                WorkflowError::journal("create step produced no model id")
            })?;

        ctx.add_record(&CompositeModelRecord {
            model_id: model_id.clone(),
        });

        ctx.update_workflow_status("assembleStructure");

        let mut parameters = BTreeMap::new();
        parameters.insert("modelId".to_string(), model_id.clone());
        ctx.enqueue_job(ASSEMBLE_COMPOSITE_STRUCTURE, None, parameters);

        Ok(())
    }

    fn structure_assembled(
        &self,
        ctx: &mut WorkflowContext,
        _result: &BTreeMap<String, String>,
    ) -> Result<(), WorkflowError> {
        // The journaled model id must still be recoverable here; losing it
        // would leave the world with an untracked structure.
        let record: CompositeModelRecord = ctx
            .find_record()?
            .ok_or_else(|| WorkflowError::journal("composite model record missing"))?;

        info!(model_id = %record.model_id, "composite structure assembled");
        ctx.update_workflow_status(WORKFLOW_COMPLETED);
        Ok(())
    }
}

impl Workflow for CompositeStructureWorkflow {
    fn workflow_type(&self) -> &'static str {
        "createCompositeStructure"
    }

    fn initialize(
        &self,
        world_id: WorldId,
        raw_params: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, WorkflowError> {
        let description = raw_params
            .get("description")
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| WorkflowError::validation("description must not be blank"))?;

        if let Some(model_id) = raw_params.get("modelId") {
            if model_id.contains('/') {
                return Err(WorkflowError::validation(
                    "modelId must reference a single model, not a collection",
                ));
            }
            if self.catalog.model_exists(world_id, model_id) {
                return Err(WorkflowError::conflict(format!(
                    "model already exists: {model_id}"
                )));
            }
        }

        if !self.catalog.generator_enabled(PREREQUISITE_GENERATOR) {
            return Err(WorkflowError::validation(format!(
                "{PREREQUISITE_GENERATOR} generator is disabled"
            )));
        }

        let mut parameters = BTreeMap::new();
        parameters.insert("description".to_string(), description.to_string());
        if let Some(model_id) = raw_params.get("modelId") {
            parameters.insert("modelId".to_string(), model_id.clone());
        }
        Ok(parameters)
    }

    fn start(&self, ctx: &mut WorkflowContext) -> Result<(), WorkflowError> {
        let parameters = ctx.parameters().clone();
        ctx.update_workflow_status("createComposite");
        ctx.enqueue_job(CREATE_COMPOSITE_MODEL, None, parameters);
        Ok(())
    }

    fn handlers(&self) -> HandlerTable<Self> {
        HandlerTable::new()
            .on(CREATE_COMPOSITE_MODEL, Self::model_created)
            .on(ASSEMBLE_COMPOSITE_STRUCTURE, Self::structure_assembled)
    }

    fn finalize(&self, ctx: &mut WorkflowContext, status: &str) {
        info!(
            instance_id = %ctx.instance_id(),
            world_id = %ctx.world_id(),
            status,
            "composite structure workflow finished"
        );
    }
}
