//! Archetype-based entity/component storage core.
//!
//! Entities are plain identifiers whose component data lives in packed
//! per-type arrays; the set of components attached to an entity is interned
//! as an archetype, and queries match entities by archetype signature.
//!
//! ```
//! use ecs_core::{EntityCoordinator, FnSystem, WorldView};
//!
//! struct Position { x: f32 }
//! struct Velocity { dx: f32 }
//!
//! let world = EntityCoordinator::new();
//! let mover = world.spawn();
//! mover.add(Position { x: 0.0 });
//! mover.add(Velocity { dx: 1.5 });
//!
//! let query = world.query().with::<Position>().with::<Velocity>().build();
//! let integrate = FnSystem::new(query, |view: WorldView<'_>, entity| {
//!     let dx = view.get::<Velocity>(entity).dx;
//!     view.get_mut::<Position>(entity).x += dx;
//! });
//! world.run(&integrate);
//!
//! assert_eq!(mover.get::<Position>().x, 1.5);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]

pub mod engine;

/// Commonly used items, importable in one line.
pub mod prelude {
    pub use crate::engine::coordinator::{EntityCoordinator, Name};
    pub use crate::engine::entity::{Entity, EntityId};
    pub use crate::engine::query::Query;
    pub use crate::engine::system::{FnSystem, System, WorldView};
    pub use crate::engine::types::{ComponentId, Signature};
}

pub use engine::archetype::{Archetype, ArchetypeTable, EMPTY_ARCHETYPE};
pub use engine::coordinator::{EntityCoordinator, Name};
pub use engine::entity::{Entity, EntityAllocator, EntityId};
pub use engine::error::{AccessError, EcsError, EcsResult, RegistryError, StorageError};
pub use engine::query::{Query, QueryBuilder};
pub use engine::registry::{ComponentInfo, ComponentRegistry};
pub use engine::storage::{ComponentColumn, PackedArray};
pub use engine::system::{FnSystem, System, WorldView};
pub use engine::types::{
    build_signature, ArchetypeId, ComponentId, Signature, COMPONENT_CAP,
};
