//! Error types for the entity/component storage core.
//!
//! Each error type models a single failure mode and carries enough structured
//! context (offending entity, component name, capacity limits) to make a log
//! line actionable. Low-level layers return these as values; the public
//! coordinator surface treats them as contract violations and panics, because
//! continuing after one would operate on inconsistent indices.
//!
//! Aggregate conversion into [`EcsError`] happens via `From`, so internal code
//! bubbles failures with `?`.

use thiserror::Error;

use crate::engine::entity::EntityId;

/// Failures raised by the component type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The configured component type capacity was exhausted.
    ///
    /// This indicates the fixed-capacity signature bitset was sized
    /// incorrectly for the application; it is fatal at registration time.
    #[error("component type capacity exceeded: at most {limit} distinct component types may be registered")]
    CapacityExceeded {
        /// The configured upper bound on distinct component types.
        limit: usize,
    },

    /// Registration was attempted after the registry was frozen.
    #[error("component registry is frozen: cannot register `{type_name}`")]
    Frozen {
        /// Rust type name of the component that could not be registered.
        type_name: &'static str,
    },
}

/// Failures raised by a packed component array.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// `insert` was called for an entity that already has a slot.
    #[error("duplicate insert of component `{component}` for entity {entity}")]
    DuplicateInsert {
        /// The entity that already holds the component.
        entity: EntityId,
        /// Rust type name of the component.
        component: &'static str,
    },

    /// `remove` or a lookup was called for an entity without a slot.
    #[error("entity {entity} has no slot in the packed array for `{component}`")]
    MissingSlot {
        /// The entity without a slot.
        entity: EntityId,
        /// Rust type name of the component.
        component: &'static str,
    },
}

/// Failures raised when resolving entities and components through the
/// coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The entity identifier is not registered with this coordinator.
    #[error("entity {entity} is not registered")]
    UnknownEntity {
        /// The unregistered (or stale) entity identifier.
        entity: EntityId,
    },

    /// The entity's archetype does not include the requested component.
    #[error("entity {entity} does not have component `{component}`")]
    MissingComponent {
        /// The entity that was probed.
        entity: EntityId,
        /// Rust type name of the missing component.
        component: &'static str,
    },

    /// The component type was never registered with this coordinator.
    #[error("component type `{type_name}` is not registered")]
    ComponentNotRegistered {
        /// Rust type name of the unregistered component.
        type_name: &'static str,
    },
}

/// Aggregate error for coordinator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// Component type registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A packed component array rejected a mutation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Entity or component resolution failed.
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Convenience alias for results carrying [`EcsError`].
pub type EcsResult<T> = Result<T, EcsError>;
