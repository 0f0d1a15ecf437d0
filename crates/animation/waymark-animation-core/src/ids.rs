//! Identifiers and a simple allocator for layer-owned primitives.

use serde::{Deserialize, Serialize};

/// A path entity (polyline) mounted on a layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// A moving marker owned by an animated entity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u32);

/// Name of a layer on the rendering surface.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        LayerId(s.to_string())
    }
}

/// Monotonic allocator for EntityId and MarkerId.
/// IDs are never reused within one layer, so late surface calls cannot hit a newer primitive.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_entity: u32,
    next_marker: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_marker(&mut self) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker = self.next_marker.wrapping_add(1);
        id
    }
}
