//! Account customization
//!
//! A customizer collects property values for a new or existing account and
//! stages them all at once on an accounts ledger.

use types::account::Account;
use types::ids::{AccountId, TokenId};

use crate::changes::{ChangeSet, ChangeSummaryManager};
use crate::errors::LedgerError;
use crate::properties::AccountValue;
use crate::transactional::TransactionalLedger;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountCustomizer {
    changes: ChangeSet<Account>,
}

impl AccountCustomizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, value: AccountValue) -> Self {
        ChangeSummaryManager::update::<Account>(&mut self.changes, value);
        self
    }

    pub fn memo(self, memo: impl Into<String>) -> Self {
        self.with(AccountValue::Memo(memo.into()))
    }

    pub fn expiry(self, expiry: i64) -> Self {
        self.with(AccountValue::Expiry(expiry))
    }

    pub fn auto_renew_period(self, secs: i64) -> Self {
        self.with(AccountValue::AutoRenewPeriod(secs))
    }

    pub fn alias(self, alias: Vec<u8>) -> Self {
        self.with(AccountValue::Alias(alias))
    }

    pub fn proxy(self, proxy: Option<AccountId>) -> Self {
        self.with(AccountValue::Proxy(proxy))
    }

    pub fn is_smart_contract(self, flag: bool) -> Self {
        self.with(AccountValue::IsSmartContract(flag))
    }

    pub fn is_receiver_sig_required(self, flag: bool) -> Self {
        self.with(AccountValue::IsReceiverSigRequired(flag))
    }

    pub fn is_deleted(self, flag: bool) -> Self {
        self.with(AccountValue::IsDeleted(flag))
    }

    pub fn max_auto_associations(self, max: i32) -> Self {
        self.with(AccountValue::MaxAutoAssociations(max))
    }

    pub fn tokens(self, tokens: Vec<TokenId>) -> Self {
        self.with(AccountValue::Tokens(tokens))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Stage every collected value on `id`.
    pub fn customize(
        &self,
        id: &AccountId,
        ledger: &mut TransactionalLedger<AccountId, Account>,
    ) -> Result<(), LedgerError> {
        for value in self.changes.values() {
            ledger.set(id, value.clone())?;
        }
        Ok(())
    }
}
