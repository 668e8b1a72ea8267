//! Systems and their execution over matching entities.
//!
//! A system names the components it operates on (as a [`Query`]) and a body
//! run once per matching entity. [`EntityCoordinator::run`] executes the body
//! sequentially in ascending identifier order; [`EntityCoordinator::run_parallel`]
//! splits the matched set into contiguous batches and fans them out over the
//! rayon pool in fork-join style, returning only after every batch finishes.
//!
//! Bodies receive a [`WorldView`] instead of an entity handle: views are
//! cheap, carry no reference count, and are the only part of the engine that
//! may cross threads. The safety contract for parallel runs is the usual one
//! for disjoint batches: a body touches only the entity it was given, and no
//! structural mutation happens while a run is in flight.

use rayon::prelude::*;
use tracing::trace;

use crate::engine::coordinator::{EntityCoordinator, WorldCell};
use crate::engine::entity::EntityId;
use crate::engine::query::Query;

/// Read/write window onto one coordinator's component data, scoped to a
/// system run.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    cell: &'a WorldCell,
}

impl<'a> WorldView<'a> {
    /// Returns a shared reference to `entity`'s `C` value.
    ///
    /// Panics if the entity is dead or does not have `C`.
    pub fn get<C: 'static + Send + Sync>(&self, entity: EntityId) -> &'a C {
        self.cell
            .state()
            .get_value(entity)
            .unwrap_or_else(|e| panic!("system access violated: {e}"))
    }

    /// Returns a mutable reference to `entity`'s `C` value.
    ///
    /// During parallel runs this is sound only for the entity the body was
    /// given; batches are disjoint, so no two threads reach the same value.
    pub fn get_mut<C: 'static + Send + Sync>(&self, entity: EntityId) -> &'a mut C {
        self.cell
            .state_mut()
            .get_value_mut(entity)
            .unwrap_or_else(|e| panic!("system access violated: {e}"))
    }

    /// Returns `true` if `entity` currently has component `C`.
    pub fn has<C: 'static>(&self, entity: EntityId) -> bool {
        self.cell.state().has_component::<C>(entity)
    }
}

/// A unit of behavior executed over every entity matching its query.
pub trait System {
    /// The components an entity must carry for this system to visit it.
    fn query(&self) -> Query;

    /// Invoked once per matching entity.
    fn process(&self, view: WorldView<'_>, entity: EntityId);
}

/// Adapter turning a closure plus a query into a [`System`].
pub struct FnSystem<F> {
    query: Query,
    body: F,
}

impl<F> FnSystem<F>
where
    F: Fn(WorldView<'_>, EntityId) + Send + Sync,
{
    pub fn new(query: Query, body: F) -> Self {
        Self { query, body }
    }
}

impl<F> System for FnSystem<F>
where
    F: Fn(WorldView<'_>, EntityId) + Send + Sync,
{
    fn query(&self) -> Query {
        self.query
    }

    fn process(&self, view: WorldView<'_>, entity: EntityId) {
        (self.body)(view, entity)
    }
}

impl EntityCoordinator {
    /// Runs `system` sequentially over every matching entity, in ascending
    /// identifier order.
    pub fn run<S: System + ?Sized>(&self, system: &S) {
        let matched = self.collect_matching(&system.query().required());
        trace!(matched = matched.len(), "running system");
        let view = WorldView { cell: &*self.cell };
        for entity in matched {
            system.process(view, entity);
        }
    }

    /// Runs `system` over every matching entity, fanning contiguous batches
    /// out across the rayon pool. Returns once every batch has completed.
    pub fn run_parallel<S: System + Sync + ?Sized>(&self, system: &S) {
        let matched = self.collect_matching(&system.query().required());
        if matched.is_empty() {
            return;
        }

        let workers = rayon::current_num_threads().max(1);
        let batch = (matched.len() + workers - 1) / workers;
        trace!(
            matched = matched.len(),
            workers,
            batch,
            "running system in parallel"
        );

        let cell = &*self.cell;
        matched.par_chunks(batch).for_each(|chunk| {
            let view = WorldView { cell };
            for &entity in chunk {
                system.process(view, entity);
            }
        });
    }
}
