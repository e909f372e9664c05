//! Net transfer accumulation
//!
//! Per-account deltas kept sorted by account id. Adding to an account that
//! already has an entry folds into it; entries that net to zero are purged
//! before the list is surfaced in a record.

use types::ids::AccountId;
use types::transfer::{AccountAmount, TransferList};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetTransfers {
    adjustments: Vec<AccountAmount>,
}

impl NetTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `amount` into the entry for `account`, inserting it at its sorted
    /// position if absent.
    pub fn update_xfers(&mut self, account: AccountId, amount: i64) {
        let mut i = 0;
        while i < self.adjustments.len() {
            let existing = self.adjustments[i].account;
            if existing == account {
                let adjustment = &mut self.adjustments[i];
                adjustment.amount = adjustment.amount.saturating_add(amount);
                return;
            }
            if existing > account {
                break;
            }
            i += 1;
        }
        self.adjustments.insert(i, AccountAmount::new(account, amount));
    }

    pub fn purge_zero_adjustments(&mut self) {
        self.adjustments.retain(|aa| aa.amount != 0);
    }

    /// Non-zero entries as a transfer list, in account order.
    pub fn to_transfer_list(&self) -> TransferList {
        TransferList::new(
            self.adjustments
                .iter()
                .filter(|aa| aa.amount != 0)
                .copied()
                .collect(),
        )
    }

    pub fn amount_of(&self, account: &AccountId) -> i64 {
        self.adjustments
            .iter()
            .find(|aa| aa.account == *account)
            .map(|aa| aa.amount)
            .unwrap_or(0)
    }

    pub fn net(&self) -> i64 {
        self.adjustments
            .iter()
            .fold(0i64, |acc, aa| acc.saturating_add(aa.amount))
    }

    pub fn remove(&mut self, account: &AccountId) {
        self.adjustments.retain(|aa| aa.account != *account);
    }

    pub fn clear(&mut self) {
        self.adjustments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountAmount> {
        self.adjustments.iter()
    }
}
