//! Engine internals: identifiers, storage, archetypes, and execution.

pub mod archetype;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod storage;
pub mod system;
pub mod types;
