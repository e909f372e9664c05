//! Transactional ledger
//!
//! Stages creations, property changes and removals of entities keyed by `K`
//! against a `Backing`, and reconciles them with it on `commit()` or discards
//! them on `rollback()`.
//!
//! Staged state per transaction:
//! - `created`: keys created in this transaction
//! - `changed`: pre-existing keys with at least one staged property
//! - `dead`: destroyed keys, excluded from the flush whatever they have staged
//! - `changes`: property -> value per created or changed key
//!
//! A commit runs in two explicit steps: `stage_preview` hands the whole
//! pending batch to the registered interceptor, which may reject it, then
//! `flush` writes every finalized entity and removes dead keys.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

use tracing::{debug, error};
use types::response::ResponseCode;

use crate::backing::{Backing, BackingStore, LedgerKey};
use crate::changes::{ChangeSet, ChangeSummaryManager, EntityChangeSet, MerkleLeafChanges};
use crate::errors::LedgerError;
use crate::interceptor::CommitInterceptor;
use crate::properties::{LedgerEntity, LedgerProperty};
use crate::scoped_check::LedgerCheck;

pub struct TransactionalLedger<K: LedgerKey, E: LedgerEntity> {
    backing: Backing<K, E>,
    in_txn: bool,
    created: BTreeSet<K>,
    changed: BTreeSet<K>,
    dead: BTreeSet<K>,
    changes: HashMap<K, ChangeSet<E>>,
    interceptor: Option<Box<dyn CommitInterceptor<K, E>>>,
}

impl<K: LedgerKey, E: LedgerEntity> TransactionalLedger<K, E> {
    pub fn new(store: Box<dyn BackingStore<K, E>>) -> Self {
        Self::over(Backing::Durable(store))
    }

    /// A ledger staging changes on top of `parent`'s staged view
    pub fn wrap(parent: TransactionalLedger<K, E>) -> Self {
        Self::over(Backing::Nested(Box::new(parent)))
    }

    fn over(backing: Backing<K, E>) -> Self {
        Self {
            backing,
            in_txn: false,
            created: BTreeSet::new(),
            changed: BTreeSet::new(),
            dead: BTreeSet::new(),
            changes: HashMap::new(),
            interceptor: None,
        }
    }

    pub fn set_commit_interceptor(&mut self, interceptor: Box<dyn CommitInterceptor<K, E>>) {
        self.interceptor = Some(interceptor);
    }

    /// The durable store, if this ledger is not nested
    pub fn store(&self) -> Option<&dyn BackingStore<K, E>> {
        match &self.backing {
            Backing::Durable(store) => Some(&**store),
            Backing::Nested(_) => None,
        }
    }

    pub fn parent(&self) -> Option<&TransactionalLedger<K, E>> {
        match &self.backing {
            Backing::Nested(parent) => Some(&**parent),
            Backing::Durable(_) => None,
        }
    }

    pub fn parent_mut(&mut self) -> Option<&mut TransactionalLedger<K, E>> {
        match &mut self.backing {
            Backing::Nested(parent) => Some(&mut **parent),
            Backing::Durable(_) => None,
        }
    }

    /// Unwrap a nested ledger, discarding anything it still has staged.
    pub fn into_parent(self) -> Option<TransactionalLedger<K, E>> {
        match self.backing {
            Backing::Nested(parent) => Some(*parent),
            Backing::Durable(_) => None,
        }
    }

    // ───────────────────────── Transaction boundaries ─────────────────────────

    pub fn is_in_transaction(&self) -> bool {
        self.in_txn
    }

    pub fn begin(&mut self) -> Result<(), LedgerError> {
        if self.in_txn {
            return Err(LedgerError::TransactionAlreadyActive);
        }
        self.in_txn = true;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<(), LedgerError> {
        self.throw_if_not_in_txn()?;
        debug!(
            created = self.created.len(),
            changed = self.changed.len(),
            dead = self.dead.len(),
            "Rolling back ledger transaction"
        );
        self.clear_staged();
        self.in_txn = false;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), LedgerError> {
        self.throw_if_not_in_txn()?;
        let batch = self.pending_changes();
        self.stage_preview(&batch)?;
        self.flush(batch)
    }

    /// Every created or changed key that is not dead, with its prior entity
    /// and staged change-set, created keys first.
    pub fn pending_changes(&self) -> EntityChangeSet<K, E> {
        let mut batch = EntityChangeSet::new();
        for id in self.created.iter().chain(self.changed.iter()) {
            if self.dead.contains(id) {
                continue;
            }
            let changes = self.changes.get(id).cloned().unwrap_or_default();
            batch.include(id.clone(), self.backing.entity(id), changes);
        }
        batch
    }

    /// Let the interceptor inspect, and possibly reject, a pending batch.
    pub fn stage_preview(&mut self, batch: &EntityChangeSet<K, E>) -> Result<(), LedgerError> {
        match self.interceptor.as_mut() {
            Some(interceptor) => interceptor.preview(batch),
            None => Ok(()),
        }
    }

    /// Write a previewed batch and remove dead keys, closing the transaction.
    ///
    /// A failure part way leaves the backing store partially written.
    pub fn flush(&mut self, batch: EntityChangeSet<K, E>) -> Result<(), LedgerError> {
        self.throw_if_not_in_txn()?;
        if let Err(err) = self.write_through(batch) {
            error!(
                error = %err,
                changes = %self.changeset_so_far(),
                "Catastrophic failure during commit"
            );
            return Err(err);
        }
        debug!("Committed ledger transaction");
        self.clear_staged();
        self.in_txn = false;
        Ok(())
    }

    fn write_through(&mut self, batch: EntityChangeSet<K, E>) -> Result<(), LedgerError> {
        let mut leaves = Vec::with_capacity(batch.size());
        for (i, entry) in batch.into_iter().enumerate() {
            let mut leaf = MerkleLeafChanges::finalize(entry);
            if let Some(interceptor) = self.interceptor.as_mut() {
                interceptor.finish(i, &mut leaf.leaf);
            }
            leaves.push(leaf);
        }
        debug!(leaves = leaves.len(), removals = self.dead.len(), "Flushing ledger batch");

        for leaf in leaves {
            self.backing.put(leaf.key, leaf.leaf)?;
        }
        let dead: Vec<K> = self.dead.iter().cloned().collect();
        for id in &dead {
            if self.backing.contains(id) {
                self.backing.remove(id)?;
            }
        }
        Ok(())
    }

    fn clear_staged(&mut self) {
        self.created.clear();
        self.changed.clear();
        self.dead.clear();
        self.changes.clear();
    }

    fn throw_if_not_in_txn(&self) -> Result<(), LedgerError> {
        if self.in_txn {
            Ok(())
        } else {
            Err(LedgerError::NoActiveTransaction)
        }
    }

    // ───────────────────────── Entity operations ─────────────────────────

    pub fn exists(&self, id: &K) -> bool {
        !self.dead.contains(id) && (self.created.contains(id) || self.backing.contains(id))
    }

    /// Whether `id` is a creation staged in this transaction
    pub fn exists_pending(&self, id: &K) -> bool {
        self.created.contains(id)
    }

    /// Whether `id` was destroyed earlier in this transaction
    pub fn is_pending_removal(&self, id: &K) -> bool {
        self.dead.contains(id)
    }

    /// Stage a new entity. A key destroyed earlier in this transaction
    /// cannot be created again until the transaction ends.
    pub fn create(&mut self, id: K) -> Result<(), LedgerError> {
        self.throw_if_not_in_txn()?;
        if self.dead.contains(&id) {
            return Err(LedgerError::PendingRemoval { key: id.to_string() });
        }
        if self.exists(&id) {
            return Err(LedgerError::already_exists(&id));
        }
        self.changes.insert(id.clone(), ChangeSet::<E>::new());
        self.created.insert(id);
        Ok(())
    }

    pub fn set(&mut self, id: &K, value: E::Value) -> Result<(), LedgerError> {
        self.throw_if_not_in_txn()?;
        if !self.exists(id) {
            return Err(LedgerError::missing(id));
        }
        if !self.created.contains(id) {
            self.changed.insert(id.clone());
        }
        ChangeSummaryManager::update::<E>(self.changes.entry(id.clone()).or_default(), value);
        Ok(())
    }

    pub fn get(&self, id: &K, property: E::Property) -> Result<E::Value, LedgerError> {
        self.read(id, property).ok_or_else(|| LedgerError::missing(id))
    }

    /// Staged value, else the backing view, else the default for a creation.
    pub(crate) fn read(&self, id: &K, property: E::Property) -> Option<E::Value> {
        if !self.exists(id) {
            return None;
        }
        if let Some(value) = self.changes.get(id).and_then(|c| c.get(&property)) {
            return Some(value.clone());
        }
        self.backing
            .read(id, property)
            .or_else(|| Some(E::default().get(property)))
    }

    /// The entity `id` would be written as if committed now.
    ///
    /// Does not consult the interceptor.
    pub fn get_finalized(&self, id: &K) -> Result<E, LedgerError> {
        self.materialize(id).ok_or_else(|| LedgerError::missing(id))
    }

    pub(crate) fn materialize(&self, id: &K) -> Option<E> {
        if !self.exists(id) {
            return None;
        }
        let mut entity = self.backing.entity(id).unwrap_or_default();
        if let Some(changes) = self.changes.get(id) {
            ChangeSummaryManager::persist(changes, &mut entity);
        }
        Some(entity)
    }

    /// Mark `id` for removal. Repeated calls are no-ops.
    pub fn destroy(&mut self, id: &K) -> Result<(), LedgerError> {
        self.throw_if_not_in_txn()?;
        self.dead.insert(id.clone());
        Ok(())
    }

    /// Run `check` against the effective properties of `id` without
    /// materializing it. A missing key is reported as `InvalidAccountId`.
    pub fn validate(&self, id: &K, check: &mut dyn LedgerCheck<E>) -> ResponseCode {
        if !self.exists(id) {
            return ResponseCode::InvalidAccountId;
        }
        let getter = |property: E::Property| -> E::Value {
            self.backing
                .read(id, property)
                .unwrap_or_else(|| E::default().get(property))
        };
        check.check_using(&getter, self.changes.get(id))
    }

    /// Strip `properties` from every staged change-set.
    pub fn undo_changes_of_type(&mut self, properties: &[E::Property]) {
        for changes in self.changes.values_mut() {
            for property in properties {
                changes.remove(property);
            }
        }
        let emptied: Vec<K> = self
            .changed
            .iter()
            .filter(|id| self.changes.get(*id).map_or(true, |c| c.is_empty()))
            .cloned()
            .collect();
        for id in emptied {
            self.changed.remove(&id);
            self.changes.remove(&id);
        }
    }

    /// Discard every staged creation, keeping other staged changes.
    pub fn undo_creations(&mut self) {
        for id in std::mem::take(&mut self.created) {
            self.changes.remove(&id);
        }
    }

    /// Human-readable description of everything staged.
    pub fn changeset_so_far(&self) -> String {
        let mut desc = String::from("{");
        let mut first = true;
        let mut sep = |desc: &mut String| {
            if !first {
                desc.push_str(", ");
            }
            first = false;
        };
        for id in self.created.iter().chain(self.changed.iter()) {
            sep(&mut desc);
            if self.created.contains(id) {
                desc.push_str("*NEW* ");
            }
            let staged: Vec<String> = self
                .changes
                .get(id)
                .map(|c| c.values().map(|v| format!("{v:?}")).collect())
                .unwrap_or_default();
            let _ = write!(desc, "{id}: [{}]", staged.join(", "));
        }
        for id in &self.dead {
            sep(&mut desc);
            let _ = write!(desc, "*DEAD* {id}");
        }
        desc.push('}');
        desc
    }

    // ───────────────────────── As a backing store ─────────────────────────

    pub fn contains(&self, id: &K) -> bool {
        self.exists(id)
    }

    /// Stage `entity` as the new state of `id`, creating it if needed. Only
    /// properties that differ from the current view are staged.
    pub fn put(&mut self, id: K, entity: E) -> Result<(), LedgerError> {
        if !self.exists(&id) {
            self.create(id.clone())?;
        }
        for property in E::Property::all() {
            let value = entity.get(*property);
            if self.read(&id, *property).as_ref() != Some(&value) {
                self.set(&id, value)?;
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &K) -> Result<(), LedgerError> {
        self.destroy(id)
    }
}
