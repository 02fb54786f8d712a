//! The per-run entity registry.
//!
//! An ordered collection of build-graph nodes keyed by unique name. Name
//! uniqueness holds across the whole registry, not per kind: a library and
//! a target cannot share a name. Declaration order is the only ordering
//! guarantee and is preserved through to emission so output is diff-stable.
//!
//! A registry is an explicit value constructed per generation run and
//! threaded through every component; there are no process-wide singletons,
//! so multiple generations can run in one process without contamination.

use std::collections::HashMap;

use crate::core::entity::{Entity, EntityKind};
use crate::core::ConfigError;

#[derive(Debug, Default)]
pub struct Registry {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register an entity, failing when its name is already taken by any
    /// kind.
    pub fn register(&mut self, entity: Entity) -> Result<(), ConfigError> {
        let name = entity.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ConfigError::DuplicateName(name));
        }
        self.index.insert(name, self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Look up an entity by name.
    pub fn lookup(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// Names of all entities of one kind, in registration order.
    ///
    /// Never sorted: the `all` target's dependency list is built from this
    /// and must stay reproducible.
    pub fn names_of_kind(&self, kind: EntityKind) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| e.kind() == kind)
            .map(Entity::name)
            .collect()
    }

    /// All entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
