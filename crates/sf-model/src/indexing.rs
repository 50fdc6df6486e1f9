//! Stable indexing for equation lookup.
//!
//! Maps model-compiler equation ids (sparse, arbitrary) to contiguous slots
//! (0..N) in declaration order.

use std::collections::HashMap;

use sf_core::EquationId;

/// Bidirectional mapping between equation ids and contiguous slots.
#[derive(Debug, Clone, Default)]
pub struct EquationIndex {
    /// Contiguous list of equation ids (slot -> EquationId).
    ids: Vec<EquationId>,

    /// Reverse lookup: EquationId -> slot.
    slots: HashMap<EquationId, usize>,
}

impl EquationIndex {
    /// Build an index over ids in slot order. Returns the first duplicate on failure.
    pub fn from_ids(ids: impl IntoIterator<Item = EquationId>) -> Result<Self, EquationId> {
        let mut index = Self::default();
        for id in ids {
            if index.slots.insert(id, index.ids.len()).is_some() {
                return Err(id);
            }
            index.ids.push(id);
        }
        Ok(index)
    }

    /// Number of indexed equations.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Slot for an equation id.
    pub fn slot(&self, id: EquationId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn contains(&self, id: EquationId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Equation id stored at a slot.
    pub fn id(&self, slot: usize) -> Option<EquationId> {
        self.ids.get(slot).copied()
    }

    /// All ids in slot order.
    pub fn ids(&self) -> &[EquationId] {
        &self.ids
    }
}
