//! World catalog boundary.
//!
//! The world/model CRUD layer is an external collaborator; workflows only
//! need existence and enablement checks from it during `initialize`. This
//! trait is that boundary, with an in-memory implementation for dev/test.

use std::collections::HashSet;
use std::sync::RwLock;

use worldforge_core::WorldId;

/// Read-only view of the world catalog consulted by workflow validation.
pub trait WorldCatalog: Send + Sync {
    /// Whether a model id already exists in the given world.
    fn model_exists(&self, world_id: WorldId, model_id: &str) -> bool;

    /// Whether a named generator is enabled for use.
    fn generator_enabled(&self, generator: &str) -> bool;
}

/// In-memory catalog for dev/test.
#[derive(Debug, Default)]
pub struct InMemoryWorldCatalog {
    models: RwLock<HashSet<(WorldId, String)>>,
    disabled_generators: RwLock<HashSet<String>>,
}

impl InMemoryWorldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&self, world_id: WorldId, model_id: impl Into<String>) {
        self.models
            .write()
            .unwrap()
            .insert((world_id, model_id.into()));
    }

    pub fn disable_generator(&self, generator: impl Into<String>) {
        self.disabled_generators
            .write()
            .unwrap()
            .insert(generator.into());
    }
}

impl WorldCatalog for InMemoryWorldCatalog {
    fn model_exists(&self, world_id: WorldId, model_id: &str) -> bool {
        self.models
            .read()
            .unwrap()
            .contains(&(world_id, model_id.to_string()))
    }

    fn generator_enabled(&self, generator: &str) -> bool {
        !self.disabled_generators.read().unwrap().contains(generator)
    }
}
