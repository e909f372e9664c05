//! Scoped validation of a single account against one balance change
//!
//! A `LedgerCheck` reads only the properties it needs, from a staged
//! change-set overlay first and then from a getter over the backing entity,
//! so validating a leg never materializes a full account.

use types::account::Account;
use types::response::ResponseCode;

use crate::balance_change::BalanceChange;
use crate::changes::ChangeSet;
use crate::config::LedgerConfig;
use crate::properties::{AccountProperty, AccountValue, LedgerEntity};

pub trait LedgerCheck<E: LedgerEntity> {
    fn check_using(
        &mut self,
        getter: &dyn Fn(E::Property) -> E::Value,
        changes: Option<&ChangeSet<E>>,
    ) -> ResponseCode;

    fn check_entity(&mut self, entity: &E, changes: Option<&ChangeSet<E>>) -> ResponseCode {
        self.check_using(&|property| entity.get(property), changes)
    }
}

/// Deleted, detached and sufficient-balance checks for one account leg
#[derive(Debug)]
pub struct MerkleAccountScopedCheck<'a> {
    expire_accounts: bool,
    expire_contracts: bool,
    now: i64,
    change: &'a mut BalanceChange,
}

impl<'a> MerkleAccountScopedCheck<'a> {
    /// `now` is the consensus second the expiry is compared against.
    pub fn new(config: &LedgerConfig, now: i64, change: &'a mut BalanceChange) -> Self {
        Self {
            expire_accounts: config.expire_accounts,
            expire_contracts: config.expire_contracts,
            now,
            change,
        }
    }

    fn expires(&self, smart_contract: bool) -> bool {
        if smart_contract {
            self.expire_contracts
        } else {
            self.expire_accounts
        }
    }
}

impl LedgerCheck<Account> for MerkleAccountScopedCheck<'_> {
    fn check_using(
        &mut self,
        getter: &dyn Fn(AccountProperty) -> AccountValue,
        changes: Option<&ChangeSet<Account>>,
    ) -> ResponseCode {
        let value = |property: AccountProperty| -> AccountValue {
            changes
                .and_then(|c| c.get(&property).cloned())
                .unwrap_or_else(|| getter(property))
        };

        if value(AccountProperty::IsDeleted).as_bool() == Some(true) {
            return ResponseCode::AccountDeleted;
        }

        let balance = value(AccountProperty::Balance).as_long().unwrap_or(0);
        let smart_contract = value(AccountProperty::IsSmartContract)
            .as_bool()
            .unwrap_or(false);
        if balance == 0 && self.expires(smart_contract) {
            let expiry = value(AccountProperty::Expiry).as_long().unwrap_or(0);
            if self.now > expiry {
                return ResponseCode::AccountExpiredAndPendingRemoval;
            }
        }

        if !self.change.is_for_hbar() {
            return ResponseCode::Ok;
        }
        match balance.checked_add(self.change.units()) {
            None => ResponseCode::InvalidAccountAmounts,
            Some(new_balance) if new_balance < 0 => self.change.code_for_insufficient_balance(),
            Some(new_balance) => {
                self.change.set_new_balance(new_balance);
                ResponseCode::Ok
            }
        }
    }
}
