//! Commit interceptors
//!
//! An interceptor previews the whole pending batch of a commit and may reject
//! it, then observes each finalized entity as it is flushed. Interceptors are
//! owned by the ledger they are registered on; a stateful interceptor is reset
//! by its caller between transactions, never by the ledger.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use types::account::Account;
use types::ids::AccountId;

use crate::changes::EntityChangeSet;
use crate::errors::LedgerError;
use crate::net_transfers::NetTransfers;
use crate::properties::{AccountProperty, LedgerEntity};

pub trait CommitInterceptor<K, E: LedgerEntity> {
    /// Inspect the full pending batch before anything is flushed.
    ///
    /// May run more than once for the same batch.
    fn preview(&mut self, pending: &EntityChangeSet<K, E>) -> Result<(), LedgerError>;

    /// Observe the `i`-th finalized entity of the previewed batch just before
    /// it is written.
    fn finish(&mut self, _i: usize, _entity: &mut E) {}
}

/// Lets a caller keep a handle on an interceptor the ledger owns.
impl<K, E: LedgerEntity, T: CommitInterceptor<K, E>> CommitInterceptor<K, E> for Rc<RefCell<T>> {
    fn preview(&mut self, pending: &EntityChangeSet<K, E>) -> Result<(), LedgerError> {
        self.borrow_mut().preview(pending)
    }

    fn finish(&mut self, i: usize, entity: &mut E) {
        self.borrow_mut().finish(i, entity)
    }
}

/// Rejects account batches whose staged balance deltas do not net to zero
#[derive(Debug, Clone, Default)]
pub struct AccountsCommitInterceptor {
    net_changes: NetTransfers,
    previews: usize,
}

impl AccountsCommitInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance deltas observed by the most recent preview.
    pub fn net_changes(&self) -> &NetTransfers {
        &self.net_changes
    }

    pub fn previews(&self) -> usize {
        self.previews
    }

    pub fn reset(&mut self) {
        self.net_changes.clear();
        self.previews = 0;
    }
}

impl CommitInterceptor<AccountId, Account> for AccountsCommitInterceptor {
    fn preview(&mut self, pending: &EntityChangeSet<AccountId, Account>) -> Result<(), LedgerError> {
        self.previews += 1;
        self.net_changes.clear();
        for entry in pending.iter() {
            let Some(staged) = entry.changes.get(&AccountProperty::Balance) else {
                continue;
            };
            let new_balance = staged.as_long().unwrap_or(0);
            let prior = entry
                .entity
                .as_ref()
                .and_then(|e| e.get(AccountProperty::Balance).as_long())
                .unwrap_or(0);
            let Some(delta) = new_balance.checked_sub(prior) else {
                return Err(LedgerError::CommitRejected {
                    reason: format!("balance change of {} overflows", entry.id),
                });
            };
            self.net_changes.update_xfers(entry.id, delta);
        }
        self.net_changes.purge_zero_adjustments();

        let net = self.net_changes.net();
        debug!(entries = pending.size(), net, "Previewed account batch");
        if net != 0 {
            return Err(LedgerError::CommitRejected {
                reason: format!("balance changes net to {net}, not zero"),
            });
        }
        Ok(())
    }
}
