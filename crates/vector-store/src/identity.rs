use crate::error::{Result, VectorStoreError};
use std::collections::BTreeMap;

/// Bijection between external ids and index slots.
///
/// Slots are handed out by the owner; the map only remembers the high-water
/// mark so that a slot number is never reused, even after `unassign`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    id_to_slot: BTreeMap<String, usize>,
    slot_to_id: BTreeMap<usize, String>,
    next_slot: usize,
}

impl IdentityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the persisted id → slot view
    pub fn from_parts(id_to_slot: BTreeMap<String, usize>, next_slot: usize) -> Result<Self> {
        let mut map = Self {
            next_slot,
            ..Self::default()
        };
        for (id, slot) in id_to_slot {
            if let Some(existing) = map.slot_to_id.get(&slot) {
                return Err(VectorStoreError::corrupt(format!(
                    "slot {slot} is mapped to both '{existing}' and '{id}'"
                )));
            }
            map.assign(id, slot)?;
        }
        Ok(map)
    }

    /// Bind `id` to `slot`. Re-binding an id to its current slot is a no-op.
    pub fn assign(&mut self, id: impl Into<String>, slot: usize) -> Result<()> {
        let id = id.into();
        if let Some(&existing) = self.id_to_slot.get(&id) {
            if existing == slot {
                return Ok(());
            }
            return Err(VectorStoreError::DuplicateId { id, slot: existing });
        }
        self.slot_to_id.insert(slot, id.clone());
        self.id_to_slot.insert(id, slot);
        self.next_slot = self.next_slot.max(slot + 1);
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<usize> {
        self.id_to_slot
            .get(id)
            .copied()
            .ok_or_else(|| VectorStoreError::NotFound(id.to_string()))
    }

    pub fn resolve_slot(&self, slot: usize) -> Result<&str> {
        self.slot_to_id
            .get(&slot)
            .map(String::as_str)
            .ok_or_else(|| VectorStoreError::NotFound(format!("slot {slot}")))
    }

    /// Drop the id's mapping. The slot stays burned.
    pub fn unassign(&mut self, id: &str) -> Option<usize> {
        let slot = self.id_to_slot.remove(id)?;
        self.slot_to_id.remove(&slot);
        Some(slot)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_slot.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_slot.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_slot.is_empty()
    }

    #[must_use]
    pub const fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Raise the high-water mark; never lowers it
    pub fn reserve_through(&mut self, next_slot: usize) {
        self.next_slot = self.next_slot.max(next_slot);
    }

    #[must_use]
    pub const fn id_to_slot(&self) -> &BTreeMap<String, usize> {
        &self.id_to_slot
    }

    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slot_to_id.keys().copied()
    }
}
