//! Entity identifiers, the slot allocator, and the reference-counted handle.

use std::fmt;
use std::rc::Rc;

use tracing::error;

use crate::engine::coordinator::WorldCell;
use crate::engine::error::EcsResult;
use crate::engine::types::{ComponentId, Generation, Signature, SlotIndex};

/// Globally unique entity identifier encoded as a packed 64-bit value.
///
/// Layout: `| generation:32 | index:32 |`. The index addresses a slot in the
/// coordinator's allocator; the generation is bumped whenever a slot is
/// released, so a packed identifier is never observed twice for two distinct
/// entities even though slot indices are recycled.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId(u64);

#[inline]
const fn make_id(index: SlotIndex, generation: Generation) -> u64 {
    ((generation as u64) << 32) | (index as u64)
}

impl EntityId {
    /// Creates an identifier from slot index and generation.
    #[inline]
    pub const fn new(index: SlotIndex, generation: Generation) -> Self {
        Self(make_id(index, generation))
    }

    /// Returns the slot index portion of the identifier.
    #[inline]
    pub const fn index(self) -> SlotIndex {
        self.0 as SlotIndex
    }

    /// Returns the generation portion of the identifier.
    #[inline]
    pub const fn generation(self) -> Generation {
        (self.0 >> 32) as Generation
    }

    /// Returns the packed 64-bit representation.
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Slot allocator for entity identifiers.
///
/// Slots are recycled through a free list; each release bumps the slot's
/// generation so stale identifiers can be told apart from the slot's current
/// occupant.
#[derive(Default)]
pub struct EntityAllocator {
    generations: Vec<Generation>,
    alive: Vec<bool>,
    free: Vec<SlotIndex>,
    live: usize,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity identifier.
    pub fn allocate(&mut self) -> EntityId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.generations.len() as SlotIndex;
                self.generations.push(0);
                self.alive.push(false);
                index
            }
        };

        self.alive[index as usize] = true;
        self.live += 1;
        EntityId::new(index, self.generations[index as usize])
    }

    /// Releases an identifier, bumping its slot generation.
    ///
    /// Returns `false` for identifiers that are stale or were never
    /// allocated.
    pub fn release(&mut self, entity: EntityId) -> bool {
        let index = entity.index() as usize;
        match self.generations.get_mut(index) {
            Some(generation)
                if *generation == entity.generation()
                    && self.alive.get(index).copied().unwrap_or(false) =>
            {
                *generation = generation.wrapping_add(1);
                self.alive[index] = false;
                self.free.push(entity.index());
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `entity` refers to the current occupant of a live
    /// slot.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        let index = entity.index() as usize;
        index < self.generations.len()
            && self.alive.get(index).copied().unwrap_or(false)
            && self.generations[index] == entity.generation()
    }

    /// Returns the number of live entities.
    pub fn live_count(&self) -> usize {
        self.live
    }
}

struct EntityInner {
    id: EntityId,
    world: Rc<WorldCell>,
}

impl Drop for EntityInner {
    fn drop(&mut self) {
        // Last handle gone: purge component data and release the slot. The
        // coordinator may already have dropped the entity through an explicit
        // `unregister_entity`; in that case there is nothing left to do.
        let state = self.world.state_mut();
        if state.is_alive(self.id) {
            if let Err(e) = state.unregister_entity(self.id) {
                // Never panic in drop; surface the inconsistency instead.
                error!(entity = %self.id, error = %e, "entity teardown failed");
            }
        }
    }
}

/// Reference-counted handle to one live entity.
///
/// Cloning a handle shares identity with the original (both refer to the same
/// row of component data); it does not deep-copy anything. The entity is
/// unregistered from its coordinator, and its component data purged from
/// every packed array, exactly when the last handle referencing it is
/// dropped.
///
/// Handles are intentionally `!Send`: the coordinator is single-writer and
/// the shared count is not synchronized, so a handle never crosses threads.
pub struct Entity {
    inner: Rc<EntityInner>,
}

impl Entity {
    pub(crate) fn from_parts(world: Rc<WorldCell>, id: EntityId) -> Self {
        Self {
            inner: Rc::new(EntityInner { id, world }),
        }
    }

    /// Returns this entity's identifier.
    #[inline]
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    /// Returns the number of handles currently sharing this entity.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Attaches component `C` to this entity.
    ///
    /// Returns the handle so calls can be chained. Adding a component the
    /// entity already has is a contract violation and panics.
    pub fn add<C: 'static + Send + Sync>(&self, value: C) -> &Self {
        self.inner
            .world
            .state_mut()
            .add_value(self.inner.id, value)
            .unwrap_or_else(|e| panic!("entity contract violated: {e}"));
        self
    }

    /// Detaches component `C` from this entity.
    ///
    /// Removing a component the entity does not have is a contract violation
    /// and panics.
    pub fn remove<C: 'static + Send + Sync>(&self) {
        self.inner
            .world
            .state_mut()
            .remove_value::<C>(self.inner.id)
            .unwrap_or_else(|e| panic!("entity contract violated: {e}"));
    }

    /// Overwrites the value of an already-attached component `C`.
    pub fn set<C: 'static + Send + Sync>(&self, value: C) {
        self.inner
            .world
            .state_mut()
            .set_value(self.inner.id, value)
            .unwrap_or_else(|e| panic!("entity contract violated: {e}"));
    }

    /// Returns a shared reference to this entity's `C` value.
    ///
    /// Panics if the entity does not have `C`. The reference points into the
    /// coordinator's packed storage; do not hold it across structural
    /// mutations (add/remove/unregister), which may relocate values.
    pub fn get<C: 'static + Send + Sync>(&self) -> &C {
        self.inner
            .world
            .state()
            .get_value(self.inner.id)
            .unwrap_or_else(|e| panic!("entity contract violated: {e}"))
    }

    /// Returns a mutable reference to this entity's `C` value.
    ///
    /// Same aliasing discipline as [`Entity::get`]: the caller must not hold
    /// the reference across structural mutations or overlapping borrows of
    /// the same component.
    pub fn get_mut<C: 'static + Send + Sync>(&self) -> &mut C {
        self.inner
            .world
            .state_mut()
            .get_value_mut(self.inner.id)
            .unwrap_or_else(|e| panic!("entity contract violated: {e}"))
    }

    /// Fallible variant of [`Entity::get`] for callers that probe.
    pub fn try_get<C: 'static + Send + Sync>(&self) -> EcsResult<&C> {
        self.inner.world.state().get_value(self.inner.id)
    }

    /// Fallible variant of [`Entity::get_mut`].
    pub fn try_get_mut<C: 'static + Send + Sync>(&self) -> EcsResult<&mut C> {
        self.inner.world.state_mut().get_value_mut(self.inner.id)
    }

    /// Returns `true` if this entity currently has component `C`.
    pub fn has<C: 'static + Send + Sync>(&self) -> bool {
        self.inner.world.state().has_component::<C>(self.inner.id)
    }

    /// Returns `true` if this entity has every component in `required`.
    pub fn has_all(&self, required: &Signature) -> bool {
        let state = self.inner.world.state();
        required
            .iter()
            .all(|component_id| state.has_component_id(self.inner.id, component_id))
    }

    /// Returns `true` if this entity has every listed component.
    pub fn has_ids(&self, component_ids: &[ComponentId]) -> bool {
        let state = self.inner.world.state();
        component_ids
            .iter()
            .all(|&component_id| state.has_component_id(self.inner.id, component_id))
    }
}

impl Clone for Entity {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.inner.id)
            .field("handles", &Rc::strong_count(&self.inner))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        let id = EntityId::new(12345, 678);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 678);
    }

    #[test]
    fn allocator_recycles_slots_not_ids() {
        let mut allocator = EntityAllocator::new();
        let first = allocator.allocate();
        assert!(allocator.is_alive(first));
        assert!(allocator.release(first));
        assert!(!allocator.is_alive(first));

        let second = allocator.allocate();
        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert!(allocator.is_alive(second));
        assert!(!allocator.is_alive(first));
    }

    #[test]
    fn release_of_stale_id_is_rejected() {
        let mut allocator = EntityAllocator::new();
        let entity = allocator.allocate();
        assert!(allocator.release(entity));
        assert!(!allocator.release(entity));
        assert_eq!(allocator.live_count(), 0);
    }
}
