//! Packed component storage.
//!
//! One [`PackedArray`] holds every value of a single component type, packed
//! contiguously. Removal is O(1) swap-remove: the last value is moved into
//! the vacated slot and both direction maps are fixed up, so iteration order
//! is not stable across removals but the array never fragments.

use std::any::{type_name, Any};
use std::collections::HashMap;

use crate::engine::entity::EntityId;
use crate::engine::error::StorageError;

/// Type-erased view of a packed array, as stored by the coordinator.
///
/// The coordinator knows components by identifier only; it goes through this
/// trait for lifecycle operations and downcasts to the concrete
/// [`PackedArray`] for typed access.
pub trait ComponentColumn: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of values currently stored.
    fn len(&self) -> usize;

    /// Returns `true` if `entity` has a value in this column.
    fn contains(&self, entity: EntityId) -> bool;

    /// Discards `entity`'s value if present. Used during entity teardown,
    /// where a missing value is not an error.
    fn discard(&mut self, entity: EntityId);
}

/// Dense storage for all values of component type `C`.
pub struct PackedArray<C> {
    values: Vec<C>,
    entity_at: Vec<EntityId>,
    slot_of: HashMap<EntityId, usize>,
}

impl<C> PackedArray<C> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            entity_at: Vec::new(),
            slot_of: HashMap::new(),
        }
    }

    /// Stores `value` for `entity` at the end of the packed region.
    pub fn insert(&mut self, entity: EntityId, value: C) -> Result<(), StorageError> {
        if self.slot_of.contains_key(&entity) {
            return Err(StorageError::DuplicateInsert {
                entity,
                component: type_name::<C>(),
            });
        }
        self.slot_of.insert(entity, self.values.len());
        self.values.push(value);
        self.entity_at.push(entity);
        Ok(())
    }

    /// Removes and returns `entity`'s value via swap-remove.
    pub fn remove(&mut self, entity: EntityId) -> Result<C, StorageError> {
        let slot = self.slot_of.remove(&entity).ok_or(StorageError::MissingSlot {
            entity,
            component: type_name::<C>(),
        })?;

        let value = self.values.swap_remove(slot);
        self.entity_at.swap_remove(slot);
        // The former tail now lives at `slot`; repoint its entity.
        if slot < self.values.len() {
            let moved = self.entity_at[slot];
            self.slot_of.insert(moved, slot);
        }
        Ok(value)
    }

    pub fn get(&self, entity: EntityId) -> Result<&C, StorageError> {
        self.slot_of
            .get(&entity)
            .map(|&slot| &self.values[slot])
            .ok_or(StorageError::MissingSlot {
                entity,
                component: type_name::<C>(),
            })
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Result<&mut C, StorageError> {
        match self.slot_of.get(&entity) {
            Some(&slot) => Ok(&mut self.values[slot]),
            None => Err(StorageError::MissingSlot {
                entity,
                component: type_name::<C>(),
            }),
        }
    }

    /// Overwrites `entity`'s value in place.
    pub fn set(&mut self, entity: EntityId, value: C) -> Result<(), StorageError> {
        *self.get_mut(entity)? = value;
        Ok(())
    }

    /// Iterates `(entity, value)` pairs in packed order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.entity_at.iter().copied().zip(self.values.iter())
    }
}

impl<C> Default for PackedArray<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static + Send + Sync> ComponentColumn for PackedArray<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.slot_of.contains_key(&entity)
    }

    fn discard(&mut self, entity: EntityId) {
        let _ = self.remove(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> EntityId {
        EntityId::new(index, 0)
    }

    #[test]
    fn insert_then_get() {
        let mut array = PackedArray::new();
        array.insert(id(0), 10u32).unwrap();
        array.insert(id(1), 20u32).unwrap();
        assert_eq!(*array.get(id(0)).unwrap(), 10);
        assert_eq!(*array.get(id(1)).unwrap(), 20);
        assert_eq!(array.iter().count(), 2);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut array = PackedArray::new();
        array.insert(id(0), 1u32).unwrap();
        assert!(matches!(
            array.insert(id(0), 2u32),
            Err(StorageError::DuplicateInsert { .. })
        ));
        assert_eq!(*array.get(id(0)).unwrap(), 1);
    }

    #[test]
    fn swap_remove_repoints_tail() {
        let mut array = PackedArray::new();
        array.insert(id(0), 10u32).unwrap();
        array.insert(id(1), 20u32).unwrap();
        array.insert(id(2), 30u32).unwrap();

        assert_eq!(array.remove(id(0)).unwrap(), 10);
        // Tail value moved into slot 0; lookups still resolve.
        assert_eq!(*array.get(id(2)).unwrap(), 30);
        assert_eq!(*array.get(id(1)).unwrap(), 20);
        assert!(matches!(
            array.remove(id(0)),
            Err(StorageError::MissingSlot { .. })
        ));
    }

    #[test]
    fn remove_last_slot_needs_no_fixup() {
        let mut array = PackedArray::new();
        array.insert(id(0), 1u32).unwrap();
        array.insert(id(1), 2u32).unwrap();
        assert_eq!(array.remove(id(1)).unwrap(), 2);
        assert_eq!(*array.get(id(0)).unwrap(), 1);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut array = PackedArray::new();
        array.insert(id(0), 1u32).unwrap();
        array.set(id(0), 9u32).unwrap();
        assert_eq!(*array.get(id(0)).unwrap(), 9);
    }

    #[test]
    fn discard_tolerates_absence() {
        let mut array: PackedArray<u32> = PackedArray::new();
        array.insert(id(0), 1).unwrap();
        array.discard(id(5));
        array.discard(id(0));
        assert_eq!(array.len(), 0);
    }
}
