//! Core identifier types and component signatures.
//!
//! This module defines the small, copyable identifiers shared across the
//! storage core, together with the fixed-size [`Signature`] bitset used to
//! describe component sets.
//!
//! ## Design
//!
//! - Component and archetype identifiers are compact integers usable as
//!   direct indices into dense tables.
//! - Component sets are fixed-size bit arrays, so archetype identity is
//!   structural equality on the bitset and subset tests are a handful of
//!   bitwise operations.
//! - Capacities are compile-time constants; exceeding them is a fatal
//!   configuration error, never a recoverable condition.

/// Unique identifier for a registered component type.
///
/// Assigned once per *type* (not per instance) by the
/// [`ComponentRegistry`](crate::engine::registry::ComponentRegistry), stable
/// for the lifetime of its coordinator, and never reused.
pub type ComponentId = u16;

/// Unique identifier for an archetype within an archetype table.
pub type ArchetypeId = u16;

/// Index of an entity slot inside the allocator.
pub type SlotIndex = u32;

/// Generation counter detecting stale entity identifiers.
pub type Generation = u32;

/// Maximum number of distinct component types registered per coordinator.
///
/// Fixed-capacity bitsets and tables are sized from this constant; exceeding
/// it at registration time is fatal.
pub const COMPONENT_CAP: usize = 256;

/// Number of `u64` words required to represent a full component signature.
pub const SIGNATURE_WORDS: usize = COMPONENT_CAP / 64;

const _: [(); 1] = [(); (COMPONENT_CAP % 64 == 0) as usize];
const _: [(); 1] = [(); (COMPONENT_CAP <= ComponentId::MAX as usize + 1) as usize];

/// Bitset representing a set of component types.
///
/// Two signatures are equal exactly when they describe the same component
/// set, independent of the order components were added. This is what makes
/// the archetype table deduplicate by structure rather than by history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    words: [u64; SIGNATURE_WORDS],
}

impl Signature {
    /// Returns the empty signature.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            words: [0u64; SIGNATURE_WORDS],
        }
    }

    /// Sets the bit corresponding to `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentId) {
        let index = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        self.words[index] |= 1u64 << bit;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentId) {
        let index = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        self.words[index] &= !(1u64 << bit);
    }

    /// Returns `true` if `component_id` is present in this signature.
    #[inline]
    pub fn has(&self, component_id: ComponentId) -> bool {
        let index = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        (self.words[index] >> bit) & 1 == 1
    }

    /// Returns `true` if every component in `required` is present here.
    #[inline]
    pub fn contains_all(&self, required: &Signature) -> bool {
        self.words
            .iter()
            .zip(required.words.iter())
            .all(|(word, need)| (word & need) == *need)
    }

    /// Returns `true` if no component is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Returns the number of components present.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over all component identifiers set in this signature, in
    /// ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((base + tz) as ComponentId)
            })
        })
    }
}

/// Builds a signature from a list of component identifiers.
pub fn build_signature(component_ids: &[ComponentId]) -> Signature {
    let mut signature = Signature::empty();
    for &component_id in component_ids {
        signature.set(component_id);
    }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_has() {
        let mut signature = Signature::empty();
        assert!(!signature.has(7));

        signature.set(7);
        signature.set(200);
        assert!(signature.has(7));
        assert!(signature.has(200));
        assert_eq!(signature.len(), 2);

        signature.clear(7);
        assert!(!signature.has(7));
        assert!(signature.has(200));
    }

    #[test]
    fn structural_equality_is_order_independent() {
        let forward = build_signature(&[1, 2, 3]);
        let backward = build_signature(&[3, 2, 1]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn subset_test() {
        let full = build_signature(&[0, 5, 64, 190]);
        let part = build_signature(&[5, 190]);
        assert!(full.contains_all(&part));
        assert!(!part.contains_all(&full));
        assert!(full.contains_all(&Signature::empty()));
    }

    #[test]
    fn iteration_is_ascending() {
        let signature = build_signature(&[190, 0, 65, 3]);
        let ids: Vec<ComponentId> = signature.iter().collect();
        assert_eq!(ids, vec![0, 3, 65, 190]);
    }
}
