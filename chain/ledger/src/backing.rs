//! Backing stores
//!
//! A `TransactionalLedger` stages changes over a `Backing`: either a durable
//! key/value store, or a parent ledger whose staged view it reads through and
//! whose staged view it flushes into on commit.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::errors::{BackingStoreError, LedgerError};
use crate::properties::LedgerEntity;
use crate::transactional::TransactionalLedger;

/// Key of a ledger entity
pub trait LedgerKey: Clone + Eq + Hash + Ord + Debug + Display + 'static {}

impl<T> LedgerKey for T where T: Clone + Eq + Hash + Ord + Debug + Display + 'static {}

/// Key/value contract of a durable entity store
pub trait BackingStore<K, E> {
    fn contains(&self, id: &K) -> bool;

    /// Mutable reference to a stored entity.
    fn get_ref(&mut self, id: &K) -> Option<&mut E>;

    fn get_immutable_ref(&self, id: &K) -> Option<&E>;

    fn put(&mut self, id: K, entity: E) -> Result<(), BackingStoreError>;

    fn remove(&mut self, id: &K) -> Result<(), BackingStoreError>;

    fn id_set(&self) -> BTreeSet<K>;

    fn size(&self) -> usize;
}

/// Hash-map backed store
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackingStore<K, E> {
    entities: HashMap<K, E>,
}

impl<K: LedgerKey, E> InMemoryBackingStore<K, E> {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    /// Seed a store with entities, e.g. state loaded at startup
    pub fn with_entities(entities: impl IntoIterator<Item = (K, E)>) -> Self {
        Self {
            entities: entities.into_iter().collect(),
        }
    }
}

impl<K: LedgerKey, E> BackingStore<K, E> for InMemoryBackingStore<K, E> {
    fn contains(&self, id: &K) -> bool {
        self.entities.contains_key(id)
    }

    fn get_ref(&mut self, id: &K) -> Option<&mut E> {
        self.entities.get_mut(id)
    }

    fn get_immutable_ref(&self, id: &K) -> Option<&E> {
        self.entities.get(id)
    }

    fn put(&mut self, id: K, entity: E) -> Result<(), BackingStoreError> {
        self.entities.insert(id, entity);
        Ok(())
    }

    fn remove(&mut self, id: &K) -> Result<(), BackingStoreError> {
        self.entities.remove(id);
        Ok(())
    }

    fn id_set(&self) -> BTreeSet<K> {
        self.entities.keys().cloned().collect()
    }

    fn size(&self) -> usize {
        self.entities.len()
    }
}

/// What a ledger reads through to and flushes into
pub enum Backing<K: LedgerKey, E: LedgerEntity> {
    Durable(Box<dyn BackingStore<K, E>>),
    Nested(Box<TransactionalLedger<K, E>>),
}

impl<K: LedgerKey, E: LedgerEntity> Backing<K, E> {
    pub fn contains(&self, id: &K) -> bool {
        match self {
            Backing::Durable(store) => store.contains(id),
            Backing::Nested(parent) => parent.exists(id),
        }
    }

    pub(crate) fn read(&self, id: &K, property: E::Property) -> Option<E::Value> {
        match self {
            Backing::Durable(store) => store.get_immutable_ref(id).map(|e| e.get(property)),
            Backing::Nested(parent) => parent.read(id, property),
        }
    }

    /// Owned copy of the entity as this backing currently sees it
    pub(crate) fn entity(&self, id: &K) -> Option<E> {
        match self {
            Backing::Durable(store) => store.get_immutable_ref(id).cloned(),
            Backing::Nested(parent) => parent.materialize(id),
        }
    }

    pub(crate) fn put(&mut self, id: K, entity: E) -> Result<(), LedgerError> {
        match self {
            Backing::Durable(store) => store.put(id, entity).map_err(LedgerError::from),
            Backing::Nested(parent) => parent.put(id, entity),
        }
    }

    pub(crate) fn remove(&mut self, id: &K) -> Result<(), LedgerError> {
        match self {
            Backing::Durable(store) => store.remove(id).map_err(LedgerError::from),
            Backing::Nested(parent) => parent.remove(id),
        }
    }
}

impl<K: LedgerKey, E: LedgerEntity> Debug for Backing<K, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::Durable(store) => write!(f, "Durable({} entities)", store.size()),
            Backing::Nested(_) => write!(f, "Nested"),
        }
    }
}
