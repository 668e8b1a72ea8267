//! Archetype table: deduplicated composition records.
//!
//! An archetype is a distinct set of component types observed on at least one
//! entity. The table interns signatures so equal compositions share one
//! record, and maintains a reverse index from component identifier to the
//! archetypes containing it, which answers "does this archetype include X"
//! and "which archetypes match this query" without scanning signatures.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::types::{ArchetypeId, ComponentId, Signature, COMPONENT_CAP};

/// One interned composition record.
#[derive(Clone, Copy, Debug)]
pub struct Archetype {
    pub id: ArchetypeId,
    pub signature: Signature,
}

/// The empty archetype is interned at construction time and every spawned
/// entity starts there.
pub const EMPTY_ARCHETYPE: ArchetypeId = 0;

pub struct ArchetypeTable {
    archetypes: Vec<Archetype>,
    signature_map: HashMap<Signature, ArchetypeId>,
    // component id -> sorted archetype ids containing that component
    component_index: Vec<Vec<ArchetypeId>>,
}

impl ArchetypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            archetypes: Vec::new(),
            signature_map: HashMap::new(),
            component_index: vec![Vec::new(); COMPONENT_CAP],
        };
        let empty = table.find_or_create(Signature::empty());
        debug_assert_eq!(empty, EMPTY_ARCHETYPE);
        table
    }

    /// Returns the archetype for `signature`, interning a new record if this
    /// composition has not been seen before.
    pub fn find_or_create(&mut self, signature: Signature) -> ArchetypeId {
        if let Some(&id) = self.signature_map.get(&signature) {
            return id;
        }

        assert!(
            self.archetypes.len() <= ArchetypeId::MAX as usize,
            "archetype table overflow"
        );
        let id = self.archetypes.len() as ArchetypeId;
        self.archetypes.push(Archetype { id, signature });
        self.signature_map.insert(signature, id);

        for component_id in signature.iter() {
            let bucket = &mut self.component_index[component_id as usize];
            // New ids are monotonically increasing, so pushing keeps the
            // bucket sorted.
            bucket.push(id);
        }

        debug!(archetype = id, components = signature.len(), "interned archetype");
        id
    }

    /// Returns the archetype for `signature` without interning.
    pub fn find(&self, signature: &Signature) -> Option<ArchetypeId> {
        self.signature_map.get(signature).copied()
    }

    /// Returns the signature of `id`.
    ///
    /// `id` must have been produced by this table.
    pub fn signature_of(&self, id: ArchetypeId) -> Signature {
        self.archetypes[id as usize].signature
    }

    /// Answers membership through the reverse index: is `component` part of
    /// archetype `id`?
    pub fn archetype_has(&self, id: ArchetypeId, component: ComponentId) -> bool {
        self.component_index[component as usize]
            .binary_search(&id)
            .is_ok()
    }

    /// Returns the sorted archetype ids containing `component`.
    pub fn archetypes_with(&self, component: ComponentId) -> &[ArchetypeId] {
        &self.component_index[component as usize]
    }

    /// Number of interned archetypes, the empty archetype included.
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self::new()
    }
}
