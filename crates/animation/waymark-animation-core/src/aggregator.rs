//! Ordered entity collection owned by a layer.

use crate::entity::EntityDescriptor;
use crate::ids::EntityId;

/// Insertion-ordered set of entity descriptors. Every successful mutation
/// bumps `revision`, which is how the owner notices it must rebuild.
#[derive(Debug, Default, Clone)]
pub struct EntityAggregator {
    entries: Vec<EntityDescriptor>,
    revision: u64,
}

impl EntityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity. An entry with the same id is replaced in place.
    pub fn add(&mut self, entity: EntityDescriptor) {
        match self.entries.iter_mut().find(|e| e.id == entity.id) {
            Some(slot) => *slot = entity,
            None => self.entries.push(entity),
        }
        self.revision += 1;
    }

    pub fn remove(&mut self, id: EntityId) -> Option<EntityDescriptor> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        self.revision += 1;
        Some(self.entries.remove(idx))
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityDescriptor> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Copy of the current entity set; descriptors share their animations.
    pub fn snapshot(&self) -> Vec<EntityDescriptor> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
