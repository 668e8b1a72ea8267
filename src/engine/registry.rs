//! Component type registry.
//!
//! Each coordinator owns one registry. Component identifiers are handed out
//! in registration order, so two coordinators that register the same types in
//! the same order agree on every identifier. Alongside the identifier the
//! registry stores a storage factory per type, which lets the rest of the
//! engine build packed arrays for a component it only knows by identifier.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use tracing::debug;

use crate::engine::error::RegistryError;
use crate::engine::storage::{ComponentColumn, PackedArray};
use crate::engine::types::{ComponentId, COMPONENT_CAP};

/// Factory producing an empty packed array for one component type.
pub type ColumnFactory = fn() -> Box<dyn ComponentColumn>;

/// Descriptor for one registered component type.
#[derive(Clone, Copy, Debug)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub name: &'static str,
    pub type_id: TypeId,
}

/// Maps component types to dense identifiers and storage factories.
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
    factories: Vec<ColumnFactory>,
    frozen: bool,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
            infos: Vec::new(),
            factories: Vec::new(),
            frozen: false,
        }
    }

    /// Registers component type `C`, returning its identifier.
    ///
    /// Registration is idempotent: a type that is already known gets its
    /// existing identifier back, even after [`ComponentRegistry::freeze`].
    pub fn register<C: 'static + Send + Sync>(&mut self) -> Result<ComponentId, RegistryError> {
        let type_id = TypeId::of::<C>();
        if let Some(&id) = self.by_type.get(&type_id) {
            return Ok(id);
        }
        if self.frozen {
            return Err(RegistryError::Frozen {
                type_name: type_name::<C>(),
            });
        }
        if self.infos.len() >= COMPONENT_CAP {
            return Err(RegistryError::CapacityExceeded {
                limit: COMPONENT_CAP,
            });
        }

        let id = self.infos.len() as ComponentId;
        self.by_type.insert(type_id, id);
        self.infos.push(ComponentInfo {
            id,
            name: type_name::<C>(),
            type_id,
        });
        self.factories
            .push(|| Box::new(PackedArray::<C>::new()) as Box<dyn ComponentColumn>);

        debug!(component = type_name::<C>(), id, "registered component type");
        Ok(id)
    }

    /// Returns the identifier of `C`, if registered.
    pub fn id_of<C: 'static>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<C>()).copied()
    }

    /// Returns the descriptor for `id`.
    ///
    /// `id` must have been produced by this registry.
    pub fn info(&self, id: ComponentId) -> &ComponentInfo {
        &self.infos[id as usize]
    }

    /// Builds an empty packed array for the component identified by `id`.
    pub fn new_column(&self, id: ComponentId) -> Box<dyn ComponentColumn> {
        (self.factories[id as usize])()
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Prevents further registrations. Lookups keep working.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(#[allow(dead_code)] f32);
    struct Velocity(#[allow(dead_code)] f32);

    #[test]
    fn ids_follow_registration_order() {
        let mut registry = ComponentRegistry::new();
        let p = registry.register::<Position>().unwrap();
        let v = registry.register::<Velocity>().unwrap();
        assert_eq!(p, 0);
        assert_eq!(v, 1);
        assert_eq!(registry.id_of::<Position>(), Some(0));
        assert_eq!(registry.id_of::<Velocity>(), Some(1));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let first = registry.register::<Position>().unwrap();
        let again = registry.register::<Position>().unwrap();
        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn freeze_rejects_new_types_only() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>().unwrap();
        registry.freeze();
        assert_eq!(registry.register::<Position>().unwrap(), 0);
        assert!(matches!(
            registry.register::<Velocity>(),
            Err(RegistryError::Frozen { .. })
        ));
    }

    #[test]
    fn factory_builds_typed_column() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Position>().unwrap();
        let column = registry.new_column(id);
        assert_eq!(column.len(), 0);
    }
}
