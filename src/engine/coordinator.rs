//! The entity coordinator: registry, allocator, archetype table, and packed
//! storage behind one facade.
//!
//! All mutable state lives in a [`CoordinatorState`] owned by a [`WorldCell`].
//! The cell hands out references through an `UnsafeCell`, which is what lets
//! entity handles and parallel system batches reach storage without threading
//! `&mut` through every call site. Safety rests on an API discipline rather
//! than the borrow checker: structural mutation (spawn, add, remove,
//! unregister) happens only between system runs on the coordinator's thread,
//! and parallel batches touch disjoint entities.

use std::any::type_name;
use std::cell::UnsafeCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::engine::archetype::{ArchetypeTable, EMPTY_ARCHETYPE};
use crate::engine::entity::{Entity, EntityAllocator, EntityId};
use crate::engine::error::{AccessError, EcsError, EcsResult, StorageError};
use crate::engine::registry::ComponentRegistry;
use crate::engine::storage::{ComponentColumn, PackedArray};
use crate::engine::types::{ArchetypeId, ComponentId, Signature};

/// Built-in display-name component attached by
/// [`EntityCoordinator::spawn_named`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name(pub String);

pub(crate) struct CoordinatorState {
    registry: ComponentRegistry,
    allocator: EntityAllocator,
    archetypes: ArchetypeTable,
    // component id -> packed array, created lazily on first attach
    columns: Vec<Option<Box<dyn ComponentColumn>>>,
    entity_archetype: HashMap<EntityId, ArchetypeId>,
}

impl CoordinatorState {
    fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            allocator: EntityAllocator::new(),
            archetypes: ArchetypeTable::new(),
            columns: Vec::new(),
            entity_archetype: HashMap::new(),
        }
    }

    pub(crate) fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    fn require_alive(&self, entity: EntityId) -> Result<(), AccessError> {
        if self.allocator.is_alive(entity) {
            Ok(())
        } else {
            Err(AccessError::UnknownEntity { entity })
        }
    }

    fn column<C: 'static + Send + Sync>(
        &self,
        id: ComponentId,
    ) -> Result<&PackedArray<C>, AccessError> {
        self.columns
            .get(id as usize)
            .and_then(|slot| slot.as_ref())
            .and_then(|column| column.as_any().downcast_ref::<PackedArray<C>>())
            .ok_or(AccessError::ComponentNotRegistered {
                type_name: type_name::<C>(),
            })
    }

    fn column_mut<C: 'static + Send + Sync>(
        &mut self,
        id: ComponentId,
    ) -> Result<&mut PackedArray<C>, AccessError> {
        self.columns
            .get_mut(id as usize)
            .and_then(|slot| slot.as_mut())
            .and_then(|column| column.as_any_mut().downcast_mut::<PackedArray<C>>())
            .ok_or(AccessError::ComponentNotRegistered {
                type_name: type_name::<C>(),
            })
    }

    fn ensure_column(&mut self, id: ComponentId) {
        let index = id as usize;
        if self.columns.len() <= index {
            self.columns.resize_with(index + 1, || None);
        }
        if self.columns[index].is_none() {
            self.columns[index] = Some(self.registry.new_column(id));
        }
    }

    pub(crate) fn spawn(&mut self) -> EntityId {
        let id = self.allocator.allocate();
        self.entity_archetype.insert(id, EMPTY_ARCHETYPE);
        trace!(entity = %id, "spawned entity");
        id
    }

    pub(crate) fn unregister_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        self.require_alive(entity)?;
        let archetype = self.entity_archetype[&entity];
        let signature = self.archetypes.signature_of(archetype);
        for component_id in signature.iter() {
            if let Some(Some(column)) = self.columns.get_mut(component_id as usize) {
                column.discard(entity);
            }
        }
        self.entity_archetype.remove(&entity);
        self.allocator.release(entity);
        trace!(entity = %entity, "unregistered entity");
        Ok(())
    }

    pub(crate) fn add_value<C: 'static + Send + Sync>(
        &mut self,
        entity: EntityId,
        value: C,
    ) -> EcsResult<()> {
        self.require_alive(entity)?;
        let component = self.registry.register::<C>()?;

        let old_archetype = self.entity_archetype[&entity];
        let mut signature = self.archetypes.signature_of(old_archetype);
        if signature.has(component) {
            return Err(EcsError::from(StorageError::DuplicateInsert {
                entity,
                component: type_name::<C>(),
            }));
        }
        signature.set(component);

        // Composition record first, value second: the insert below cannot
        // fail once the duplicate check has passed.
        let new_archetype = self.archetypes.find_or_create(signature);
        self.entity_archetype.insert(entity, new_archetype);
        self.ensure_column(component);
        self.column_mut::<C>(component)?.insert(entity, value)?;
        Ok(())
    }

    pub(crate) fn remove_value<C: 'static + Send + Sync>(
        &mut self,
        entity: EntityId,
    ) -> EcsResult<()> {
        self.require_alive(entity)?;
        let component = self
            .registry
            .id_of::<C>()
            .ok_or(AccessError::ComponentNotRegistered {
                type_name: type_name::<C>(),
            })?;

        let old_archetype = self.entity_archetype[&entity];
        let mut signature = self.archetypes.signature_of(old_archetype);
        if !signature.has(component) {
            return Err(EcsError::from(AccessError::MissingComponent {
                entity,
                component: type_name::<C>(),
            }));
        }
        signature.clear(component);

        let new_archetype = self.archetypes.find_or_create(signature);
        self.entity_archetype.insert(entity, new_archetype);
        self.column_mut::<C>(component)?.remove(entity)?;
        Ok(())
    }

    pub(crate) fn set_value<C: 'static + Send + Sync>(
        &mut self,
        entity: EntityId,
        value: C,
    ) -> EcsResult<()> {
        self.require_alive(entity)?;
        let component = self
            .registry
            .id_of::<C>()
            .ok_or(AccessError::ComponentNotRegistered {
                type_name: type_name::<C>(),
            })?;
        self.column_mut::<C>(component)?.set(entity, value)?;
        Ok(())
    }

    pub(crate) fn get_value<C: 'static + Send + Sync>(
        &self,
        entity: EntityId,
    ) -> EcsResult<&C> {
        self.require_alive(entity)?;
        let component = self
            .registry
            .id_of::<C>()
            .ok_or(AccessError::ComponentNotRegistered {
                type_name: type_name::<C>(),
            })?;
        // Presence is decided by the archetype record, not by probing the
        // packed array; the two agree, but the archetype is the source of
        // truth.
        if !self.has_component_id(entity, component) {
            return Err(EcsError::from(AccessError::MissingComponent {
                entity,
                component: type_name::<C>(),
            }));
        }
        Ok(self.column::<C>(component)?.get(entity)?)
    }

    pub(crate) fn get_value_mut<C: 'static + Send + Sync>(
        &mut self,
        entity: EntityId,
    ) -> EcsResult<&mut C> {
        self.require_alive(entity)?;
        let component = self
            .registry
            .id_of::<C>()
            .ok_or(AccessError::ComponentNotRegistered {
                type_name: type_name::<C>(),
            })?;
        if !self.has_component_id(entity, component) {
            return Err(EcsError::from(AccessError::MissingComponent {
                entity,
                component: type_name::<C>(),
            }));
        }
        Ok(self.column_mut::<C>(component)?.get_mut(entity)?)
    }

    pub(crate) fn has_component<C: 'static>(&self, entity: EntityId) -> bool {
        match self.registry.id_of::<C>() {
            Some(component) => self.has_component_id(entity, component),
            None => false,
        }
    }

    /// Membership check routed through the archetype table's reverse index.
    pub(crate) fn has_component_id(&self, entity: EntityId, component: ComponentId) -> bool {
        match self.entity_archetype.get(&entity) {
            Some(&archetype) => self.archetypes.archetype_has(archetype, component),
            None => false,
        }
    }

    pub(crate) fn register_component<C: 'static + Send + Sync>(
        &mut self,
    ) -> EcsResult<ComponentId> {
        Ok(self.registry.register::<C>()?)
    }

    pub(crate) fn component_id<C: 'static>(&self) -> Option<ComponentId> {
        self.registry.id_of::<C>()
    }

    pub(crate) fn archetype_of(&self, entity: EntityId) -> Option<ArchetypeId> {
        self.entity_archetype.get(&entity).copied()
    }

    pub(crate) fn signature_of(&self, entity: EntityId) -> Option<Signature> {
        self.archetype_of(entity)
            .map(|archetype| self.archetypes.signature_of(archetype))
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    pub(crate) fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub(crate) fn freeze_components(&mut self) {
        self.registry.freeze();
    }

    /// Collects the live entities whose composition covers `required`, in
    /// ascending identifier order.
    pub(crate) fn collect_matching(&self, required: &Signature) -> Vec<EntityId> {
        let mut matched: Vec<EntityId> = self
            .entity_archetype
            .iter()
            .filter(|(_, &archetype)| {
                self.archetypes
                    .signature_of(archetype)
                    .contains_all(required)
            })
            .map(|(&entity, _)| entity)
            .collect();
        matched.sort_unstable();
        matched
    }
}

/// Shared cell holding the coordinator state.
///
/// `Sync` is asserted so parallel system batches can read component data
/// through a shared reference. The coordinator API upholds the actual safety
/// contract: no structural mutation while batches run, and no two batches
/// touching the same entity.
pub struct WorldCell {
    state: UnsafeCell<CoordinatorState>,
}

unsafe impl Sync for WorldCell {}

impl WorldCell {
    fn new() -> Self {
        Self {
            state: UnsafeCell::new(CoordinatorState::new()),
        }
    }

    pub(crate) fn state(&self) -> &CoordinatorState {
        unsafe { &*self.state.get() }
    }

    #[allow(clippy::mut_from_ref)]
    pub(crate) fn state_mut(&self) -> &mut CoordinatorState {
        unsafe { &mut *self.state.get() }
    }
}

/// Facade over one independent world of entities and components.
///
/// Coordinators are fully isolated from each other: identifiers, registries,
/// and storage never cross between two coordinators. Component identifiers
/// are assigned in registration order, so two coordinators that register the
/// same types in the same order agree on every identifier.
pub struct EntityCoordinator {
    pub(crate) cell: Rc<WorldCell>,
}

impl EntityCoordinator {
    pub fn new() -> Self {
        debug!("created entity coordinator");
        Self {
            cell: Rc::new(WorldCell::new()),
        }
    }

    /// Registers component type `C` ahead of use, returning its identifier.
    ///
    /// Attaching an unregistered component registers it implicitly; explicit
    /// registration exists to pin identifier order and to pre-declare the
    /// full component set before [`EntityCoordinator::freeze_components`].
    pub fn register_component<C: 'static + Send + Sync>(&self) -> ComponentId {
        self.cell
            .state_mut()
            .register_component::<C>()
            .unwrap_or_else(|e| panic!("component registration failed: {e}"))
    }

    /// Returns the identifier assigned to `C`, if it has been registered.
    pub fn component_id<C: 'static>(&self) -> Option<ComponentId> {
        self.cell.state().component_id::<C>()
    }

    /// Closes the component set. Further registrations of new types panic;
    /// re-registration of known types keeps working.
    pub fn freeze_components(&self) {
        self.cell.state_mut().freeze_components();
    }

    /// Creates a new entity with no components and returns its handle.
    pub fn spawn(&self) -> Entity {
        let id = self.cell.state_mut().spawn();
        Entity::from_parts(Rc::clone(&self.cell), id)
    }

    /// Creates a new entity carrying a [`Name`] component.
    pub fn spawn_named(&self, name: &str) -> Entity {
        let entity = self.spawn();
        entity.add(Name(name.to_owned()));
        entity
    }

    /// Returns `true` if `entity` refers to a currently live entity.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.cell.state().is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.cell.state().entity_count()
    }

    /// Number of interned archetypes, the empty archetype included.
    pub fn archetype_count(&self) -> usize {
        self.cell.state().archetype_count()
    }

    /// Returns the archetype `entity` currently belongs to.
    pub fn archetype_of(&self, entity: EntityId) -> Option<ArchetypeId> {
        self.cell.state().archetype_of(entity)
    }

    /// Returns the composition signature of `entity`.
    pub fn signature_of(&self, entity: EntityId) -> Option<Signature> {
        self.cell.state().signature_of(entity)
    }

    /// Collects the live entities whose composition covers `required`, in
    /// ascending identifier order.
    pub fn collect_matching(&self, required: &Signature) -> Vec<EntityId> {
        self.cell.state().collect_matching(required)
    }
}

impl Default for EntityCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
