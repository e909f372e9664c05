//! Pending change value objects
//!
//! - `ChangeSet`: property -> staged value for one key, iterated in property order
//! - `EntityChanges` / `EntityChangeSet`: the batch a commit previews
//! - `MerkleLeafChanges`: a finalized leaf ready to be written to the backing store

use std::collections::BTreeMap;

use crate::properties::{LedgerEntity, PropertyValue};

/// Staged values of one key, ordered by property
pub type ChangeSet<E> = BTreeMap<<E as LedgerEntity>::Property, <E as LedgerEntity>::Value>;

/// Merges change-sets into entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeSummaryManager;

impl ChangeSummaryManager {
    /// Apply every staged value to `entity`, in property order.
    pub fn persist<E: LedgerEntity>(changes: &ChangeSet<E>, entity: &mut E) {
        for value in changes.values() {
            entity.set(value.clone());
        }
    }

    /// Stage `value` under the property it names, replacing any earlier value.
    pub fn update<E: LedgerEntity>(changes: &mut ChangeSet<E>, value: E::Value) {
        changes.insert(value.property(), value);
    }
}

/// One key's pending mutation, with the entity as it was before the transaction
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChanges<K, E: LedgerEntity> {
    pub id: K,
    /// `None` when the key is being created
    pub entity: Option<E>,
    pub changes: ChangeSet<E>,
}

impl<K, E: LedgerEntity> EntityChanges<K, E> {
    pub fn is_creation(&self) -> bool {
        self.entity.is_none()
    }

    /// Staged value of `property`, falling back to the prior entity.
    pub fn effective(&self, property: E::Property) -> Option<E::Value> {
        self.changes
            .get(&property)
            .cloned()
            .or_else(|| self.entity.as_ref().map(|e| e.get(property)))
    }
}

/// Full pending batch of one commit
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChangeSet<K, E: LedgerEntity> {
    entries: Vec<EntityChanges<K, E>>,
}

impl<K, E: LedgerEntity> Default for EntityChangeSet<K, E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, E: LedgerEntity> EntityChangeSet<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, id: K, entity: Option<E>, changes: ChangeSet<E>) {
        self.entries.push(EntityChanges {
            id,
            entity,
            changes,
        });
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id(&self, i: usize) -> Option<&K> {
        self.entries.get(i).map(|e| &e.id)
    }

    pub fn entity(&self, i: usize) -> Option<&E> {
        self.entries.get(i).and_then(|e| e.entity.as_ref())
    }

    pub fn changes(&self, i: usize) -> Option<&ChangeSet<E>> {
        self.entries.get(i).map(|e| &e.changes)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityChanges<K, E>> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K, E: LedgerEntity> IntoIterator for EntityChangeSet<K, E> {
    type Item = EntityChanges<K, E>;
    type IntoIter = std::vec::IntoIter<EntityChanges<K, E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A finalized leaf and the change-set that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleLeafChanges<K, E: LedgerEntity> {
    pub key: K,
    pub leaf: E,
    pub changes: ChangeSet<E>,
}

impl<K, E: LedgerEntity> MerkleLeafChanges<K, E> {
    /// Finalize one pending entry: the prior entity (or a fresh default) with
    /// its staged changes merged in.
    pub fn finalize(entry: EntityChanges<K, E>) -> Self {
        let mut leaf = entry.entity.unwrap_or_default();
        ChangeSummaryManager::persist(&entry.changes, &mut leaf);
        Self {
            key: entry.id,
            leaf,
            changes: entry.changes,
        }
    }
}
