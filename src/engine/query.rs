//! Query construction.
//!
//! A query is just a required-components signature. The builder resolves
//! component types against its coordinator's registry, registering any type
//! it has not seen, so the finished [`Query`] is a plain `Copy` value that
//! systems can hold without borrowing the coordinator.

use crate::engine::coordinator::EntityCoordinator;
use crate::engine::entity::EntityId;
use crate::engine::types::Signature;

/// Resolved query: the set of components an entity must carry to match.
#[derive(Clone, Copy, Debug, Default)]
pub struct Query {
    required: Signature,
}

impl Query {
    /// The signature an entity's composition must cover.
    #[inline]
    pub fn required(&self) -> Signature {
        self.required
    }

    /// Returns `true` if `candidate` covers this query's requirements.
    #[inline]
    pub fn matches(&self, candidate: &Signature) -> bool {
        candidate.contains_all(&self.required)
    }
}

/// Builds a [`Query`] against one coordinator's component registry.
pub struct QueryBuilder<'a> {
    coordinator: &'a EntityCoordinator,
    required: Signature,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(coordinator: &'a EntityCoordinator) -> Self {
        Self {
            coordinator,
            required: Signature::empty(),
        }
    }

    /// Requires component `C`, registering it if needed.
    pub fn with<C: 'static + Send + Sync>(mut self) -> Self {
        let component = self.coordinator.register_component::<C>();
        self.required.set(component);
        self
    }

    pub fn build(self) -> Query {
        Query {
            required: self.required,
        }
    }
}

impl EntityCoordinator {
    /// Starts building a query against this coordinator.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// Collects the live entities matching `query`, in ascending identifier
    /// order.
    pub fn matching(&self, query: &Query) -> Vec<EntityId> {
        self.collect_matching(&query.required())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(#[allow(dead_code)] f32);
    struct Velocity(#[allow(dead_code)] f32);

    #[test]
    fn builder_accumulates_requirements() {
        let coordinator = EntityCoordinator::new();
        let query = coordinator.query().with::<Position>().with::<Velocity>().build();
        assert_eq!(query.required().len(), 2);
    }

    #[test]
    fn match_requires_full_coverage() {
        let coordinator = EntityCoordinator::new();
        let both = coordinator.query().with::<Position>().with::<Velocity>().build();
        let just_position = coordinator.query().with::<Position>().build();

        let entity = coordinator.spawn();
        entity.add(Position(0.0));
        let signature = coordinator.signature_of(entity.id()).unwrap();

        assert!(just_position.matches(&signature));
        assert!(!both.matches(&signature));
    }
}
