//! Balance ledger over accounts, token relationships and NFTs
//!
//! `HederaLedger` fans transaction boundaries out to its underlying ledgers
//! and layers double-entry currency operations over them. Every HBAR
//! adjustment it stages is also folded into a per-transaction net transfer
//! list; a commit whose net list does not sum to zero is refused.
//!
//! Multi-leg operations compute every new balance before staging any of
//! them, so a failing leg never leaves a partial adjustment behind.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, error};
use types::account::{Account, TokenRelationship, UniqueToken};
use types::ids::{AccountId, NftId, TokenId, TokenRelKey};
use types::response::ResponseCode;
use types::transfer::{AccountAmount, TokenTransferList, TransferList};

use crate::balance_change::BalanceChange;
use crate::config::LedgerConfig;
use crate::customizer::AccountCustomizer;
use crate::entity_ids::{EntityIdSource, SequentialIdSource};
use crate::errors::LedgerError;
use crate::historian::RecordsHistorian;
use crate::net_transfers::NetTransfers;
use crate::properties::{AccountProperty, AccountValue, TokenRelProperty};
use crate::scoped_check::MerkleAccountScopedCheck;
use crate::token_store::{TokenLedgers, TokenStore};
use crate::transactional::TransactionalLedger;

/// Account properties a token operation may touch
const TOKEN_SIDE_EFFECTS: [AccountProperty; 3] = [
    AccountProperty::NumNftsOwned,
    AccountProperty::Tokens,
    AccountProperty::UsedAutoAssociations,
];

pub struct HederaLedger {
    config: LedgerConfig,
    accounts: TransactionalLedger<AccountId, Account>,
    token_rels: Option<TransactionalLedger<TokenRelKey, TokenRelationship>>,
    nfts: Option<TransactionalLedger<NftId, UniqueToken>>,
    token_store: Option<Box<dyn TokenStore>>,
    historian: Option<Box<dyn RecordsHistorian>>,
    ids: Box<dyn EntityIdSource>,
    consensus_now: DateTime<Utc>,
    net_transfers: NetTransfers,
    net_token_transfers: BTreeMap<TokenId, NetTransfers>,
}

impl HederaLedger {
    pub fn new(accounts: TransactionalLedger<AccountId, Account>) -> Self {
        Self::with_config(accounts, LedgerConfig::default())
    }

    pub fn with_config(accounts: TransactionalLedger<AccountId, Account>, config: LedgerConfig) -> Self {
        Self {
            config,
            accounts,
            token_rels: None,
            nfts: None,
            token_store: None,
            historian: None,
            ids: Box::new(SequentialIdSource::default()),
            consensus_now: DateTime::<Utc>::default(),
            net_transfers: NetTransfers::new(),
            net_token_transfers: BTreeMap::new(),
        }
    }

    /// Wire the token-relationship ledger, an optional NFT ledger and the
    /// token store that guards them.
    pub fn with_token_ledgers(
        mut self,
        token_rels: TransactionalLedger<TokenRelKey, TokenRelationship>,
        nfts: Option<TransactionalLedger<NftId, UniqueToken>>,
        token_store: Box<dyn TokenStore>,
    ) -> Self {
        self.token_rels = Some(token_rels);
        self.nfts = nfts;
        self.token_store = Some(token_store);
        self
    }

    pub fn with_historian(mut self, historian: Box<dyn RecordsHistorian>) -> Self {
        self.historian = Some(historian);
        self
    }

    pub fn with_id_source(mut self, ids: Box<dyn EntityIdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn accounts(&self) -> &TransactionalLedger<AccountId, Account> {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut TransactionalLedger<AccountId, Account> {
        &mut self.accounts
    }

    pub fn token_rels(&self) -> Option<&TransactionalLedger<TokenRelKey, TokenRelationship>> {
        self.token_rels.as_ref()
    }

    pub fn nfts(&self) -> Option<&TransactionalLedger<NftId, UniqueToken>> {
        self.nfts.as_ref()
    }

    pub fn token_store(&self) -> Option<&dyn TokenStore> {
        self.token_store.as_deref()
    }

    pub fn set_consensus_time(&mut self, now: DateTime<Utc>) {
        self.consensus_now = now;
    }

    pub fn consensus_time(&self) -> DateTime<Utc> {
        self.consensus_now
    }

    fn now_secs(&self) -> i64 {
        self.consensus_now.timestamp()
    }

    /// Next id from the id source whose number is free in the accounts
    /// ledger, skipping numbers already held by a live or destroyed account.
    pub fn new_account_id(&mut self, sponsor: &AccountId) -> AccountId {
        loop {
            let id = self.ids.new_account_id(sponsor);
            if !self.accounts.exists(&id) && !self.accounts.is_pending_removal(&id) {
                return id;
            }
            debug!(account = %id, "Skipped account number already in use");
        }
    }

    /// Give the most recently allocated number back to the id source.
    pub fn reclaim_last_id(&mut self) {
        self.ids.reclaim_last_id();
    }

    // ───────────────────────── Transaction boundaries ─────────────────────────

    pub fn begin(&mut self) -> Result<(), LedgerError> {
        self.accounts.begin()?;
        if let Some(rels) = self.token_rels.as_mut() {
            rels.begin()?;
        }
        if let Some(nfts) = self.nfts.as_mut() {
            nfts.begin()?;
        }
        debug!(consensus_time = %self.consensus_now, "Began ledger transaction");
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<(), LedgerError> {
        self.accounts.rollback()?;
        if let Some(rels) = self.token_rels.as_mut() {
            if rels.is_in_transaction() {
                rels.rollback()?;
            }
        }
        if let Some(nfts) = self.nfts.as_mut() {
            if nfts.is_in_transaction() {
                nfts.rollback()?;
            }
        }
        self.clear_net_transfers();
        Ok(())
    }

    /// Refuses to commit unless the pending HBAR adjustments net to zero.
    pub fn commit(&mut self) -> Result<(), LedgerError> {
        let net = self.net_transfers.net();
        if net != 0 {
            error!(
                net,
                transfers = ?self.net_transfers.to_transfer_list(),
                changes = %self.accounts.changeset_so_far(),
                "Inconsistent adjustments at commit"
            );
            return Err(LedgerError::InconsistentAdjustments { net });
        }

        if let Some(historian) = self.historian.as_mut() {
            historian.finalize_expirable_transaction_record();
        }
        self.accounts.commit()?;
        if let Some(historian) = self.historian.as_mut() {
            historian.save_expirable_transaction_record();
            historian.note_new_expiration_events();
        }
        if let Some(rels) = self.token_rels.as_mut() {
            if rels.is_in_transaction() {
                rels.commit()?;
            }
        }
        if let Some(nfts) = self.nfts.as_mut() {
            if nfts.is_in_transaction() {
                nfts.commit()?;
            }
        }
        self.clear_net_transfers();
        Ok(())
    }

    fn clear_net_transfers(&mut self) {
        self.net_transfers.clear();
        self.net_token_transfers.clear();
    }

    /// Non-zero HBAR adjustments staged so far, in account order.
    pub fn net_transfers_in_txn(&self) -> TransferList {
        self.net_transfers.to_transfer_list()
    }

    /// Non-zero fungible token adjustments staged so far, in token order.
    pub fn net_token_transfers_in_txn(&self) -> Vec<TokenTransferList> {
        self.net_token_transfers
            .iter()
            .filter_map(|(token, xfers)| {
                let list = xfers.to_transfer_list();
                if list.is_empty() {
                    None
                } else {
                    Some(TokenTransferList::fungible(*token, list.account_amounts))
                }
            })
            .collect()
    }

    // ───────────────────────── Account state ─────────────────────────

    pub fn exists(&self, id: &AccountId) -> bool {
        self.accounts.exists(id)
    }

    pub fn get_balance(&self, id: &AccountId) -> Result<i64, LedgerError> {
        Ok(self
            .accounts
            .get(id, AccountProperty::Balance)?
            .as_long()
            .unwrap_or(0))
    }

    pub fn is_deleted(&self, id: &AccountId) -> Result<bool, LedgerError> {
        Ok(self
            .accounts
            .get(id, AccountProperty::IsDeleted)?
            .as_bool()
            .unwrap_or(false))
    }

    pub fn expiry(&self, id: &AccountId) -> Result<i64, LedgerError> {
        Ok(self
            .accounts
            .get(id, AccountProperty::Expiry)?
            .as_long()
            .unwrap_or(0))
    }

    /// Zero balance, past expiry, and its kind is subject to expiry.
    pub fn is_detached(&self, id: &AccountId) -> Result<bool, LedgerError> {
        let smart_contract = self
            .accounts
            .get(id, AccountProperty::IsSmartContract)?
            .as_bool()
            .unwrap_or(false);
        Ok(self.config.expires(smart_contract)
            && self.get_balance(id)? == 0
            && self.now_secs() > self.expiry(id)?)
    }

    fn throw_if_unusable(&self, id: &AccountId) -> Result<(), LedgerError> {
        if !self.accounts.exists(id) {
            return Err(LedgerError::missing(id));
        }
        if self.is_deleted(id)? {
            return Err(LedgerError::DeletedAccount { account: *id });
        }
        if self.is_detached(id)? {
            return Err(LedgerError::DetachedAccount { account: *id });
        }
        Ok(())
    }

    // ───────────────────────── HBAR ─────────────────────────

    /// Balance `id` would hold after `adjustment`, without staging it.
    pub fn compute_new_balance(&self, id: &AccountId, adjustment: i64) -> Result<i64, LedgerError> {
        self.throw_if_unusable(id)?;
        Self::apply(*id, self.get_balance(id)?, adjustment)
    }

    fn apply(account: AccountId, balance: i64, adjustment: i64) -> Result<i64, LedgerError> {
        match balance.checked_add(adjustment) {
            Some(new_balance) if new_balance >= 0 => Ok(new_balance),
            Some(_) => Err(LedgerError::InsufficientFunds {
                account,
                balance,
                adjustment,
            }),
            None => Err(LedgerError::InvalidTransaction(ResponseCode::InvalidAccountAmounts)),
        }
    }

    fn set_balance(&mut self, id: &AccountId, balance: i64) -> Result<(), LedgerError> {
        self.accounts.set(id, AccountValue::Balance(balance))
    }

    pub fn adjust_balance(&mut self, id: &AccountId, adjustment: i64) -> Result<(), LedgerError> {
        let new_balance = self.compute_new_balance(id, adjustment)?;
        self.set_balance(id, new_balance)?;
        self.net_transfers.update_xfers(*id, adjustment);
        Ok(())
    }

    pub fn do_transfer(&mut self, from: &AccountId, to: &AccountId, amount: i64) -> Result<(), LedgerError> {
        self.do_transfers(&TransferList::new(vec![
            AccountAmount::new(*from, -amount),
            AccountAmount::new(*to, amount),
        ]))
    }

    /// Apply a zero-sum list of adjustments; an account may appear more
    /// than once.
    pub fn do_transfers(&mut self, transfers: &TransferList) -> Result<(), LedgerError> {
        let net = transfers.net();
        if net != 0 {
            return Err(LedgerError::NonZeroNetTransfers { net });
        }

        let mut new_balances: HashMap<AccountId, i64> = HashMap::new();
        for aa in &transfers.account_amounts {
            let current = match new_balances.get(&aa.account) {
                Some(balance) => *balance,
                None => {
                    self.throw_if_unusable(&aa.account)?;
                    self.get_balance(&aa.account)?
                }
            };
            new_balances.insert(aa.account, Self::apply(aa.account, current, aa.amount)?);
        }

        for (account, balance) in &new_balances {
            self.set_balance(account, *balance)?;
        }
        for aa in &transfers.account_amounts {
            self.net_transfers.update_xfers(aa.account, aa.amount);
        }
        Ok(())
    }

    /// Run the scoped account check for one HBAR leg, storing its new
    /// balance on success.
    pub fn validate_hbar_change(&self, change: &mut BalanceChange) -> ResponseCode {
        let account = change.account();
        let mut check = MerkleAccountScopedCheck::new(&self.config, self.now_secs(), change);
        self.accounts.validate(&account, &mut check)
    }

    /// Validate an HBAR leg on top of the units earlier legs of the same
    /// batch already moved for its account.
    ///
    /// `running` maps each account to the units validated for it so far. On
    /// success the leg carries the account's cumulative new balance, so
    /// staging the legs in order leaves the last one for each account in
    /// place.
    pub fn validate_hbar_change_in_batch(
        &self,
        change: &mut BalanceChange,
        running: &mut HashMap<AccountId, i64>,
    ) -> ResponseCode {
        let account = change.account();
        let prior = running.get(&account).copied().unwrap_or(0);
        let Some(total) = prior.checked_add(change.units()) else {
            return ResponseCode::InvalidAccountAmounts;
        };
        let mut combined = change.clone();
        combined.aggregate_units(prior);
        let validity = self.validate_hbar_change(&mut combined);
        if validity.is_ok() {
            if let Some(new_balance) = combined.new_balance() {
                change.set_new_balance(new_balance);
            }
            running.insert(account, total);
        }
        validity
    }

    /// Stage the balances resolved by validation for every HBAR leg.
    pub fn adjust_hbar_unchecked(&mut self, changes: &[BalanceChange]) -> Result<(), LedgerError> {
        for change in changes.iter().filter(|c| c.is_for_hbar()) {
            let Some(new_balance) = change.new_balance() else {
                continue;
            };
            self.set_balance(&change.account(), new_balance)?;
            self.net_transfers.update_xfers(change.account(), change.units());
        }
        Ok(())
    }

    // ───────────────────────── Tokens ─────────────────────────

    fn with_token_store<T>(
        &mut self,
        op: impl FnOnce(&mut dyn TokenStore, &mut TokenLedgers<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let (Some(store), Some(rels)) = (self.token_store.as_mut(), self.token_rels.as_mut()) else {
            return Err(LedgerError::TokenLedgersUnavailable);
        };
        let mut ledgers = TokenLedgers {
            accounts: &mut self.accounts,
            rels,
            nfts: self.nfts.as_mut(),
        };
        op(&mut **store, &mut ledgers)
    }

    fn record_token_xfer(&mut self, token: TokenId, account: AccountId, units: i64) {
        self.net_token_transfers
            .entry(token)
            .or_default()
            .update_xfers(account, units);
    }

    pub fn get_token_balance(&self, account: &AccountId, token: &TokenId) -> Result<i64, LedgerError> {
        let rels = self
            .token_rels
            .as_ref()
            .ok_or(LedgerError::TokenLedgersUnavailable)?;
        Ok(rels
            .get(&TokenRelKey::new(*account, *token), TokenRelProperty::TokenBalance)?
            .as_long()
            .unwrap_or(0))
    }

    pub fn adjust_token_balance(
        &mut self,
        account: &AccountId,
        token: &TokenId,
        adjustment: i64,
    ) -> Result<ResponseCode, LedgerError> {
        let (account, token) = (*account, *token);
        let validity =
            self.with_token_store(|store, ledgers| store.adjust_balance(ledgers, account, token, adjustment))?;
        if validity.is_ok() {
            self.record_token_xfer(token, account, adjustment);
        }
        Ok(validity)
    }

    pub fn grant_kyc(&mut self, account: &AccountId, token: &TokenId) -> Result<ResponseCode, LedgerError> {
        let (account, token) = (*account, *token);
        self.with_token_store(|store, ledgers| store.grant_kyc(ledgers, account, token))
    }

    pub fn revoke_kyc(&mut self, account: &AccountId, token: &TokenId) -> Result<ResponseCode, LedgerError> {
        let (account, token) = (*account, *token);
        self.with_token_store(|store, ledgers| store.revoke_kyc(ledgers, account, token))
    }

    pub fn freeze(&mut self, account: &AccountId, token: &TokenId) -> Result<ResponseCode, LedgerError> {
        let (account, token) = (*account, *token);
        self.with_token_store(|store, ledgers| store.freeze(ledgers, account, token))
    }

    pub fn unfreeze(&mut self, account: &AccountId, token: &TokenId) -> Result<ResponseCode, LedgerError> {
        let (account, token) = (*account, *token);
        self.with_token_store(|store, ledgers| store.unfreeze(ledgers, account, token))
    }

    /// Validate and stage one token leg through the token store.
    pub fn try_token_change(&mut self, change: &BalanceChange) -> Result<ResponseCode, LedgerError> {
        let validity = self.with_token_store(|store, ledgers| store.try_token_change(ledgers, change))?;
        if validity.is_ok() && change.is_for_fungible_token() {
            if let Some(token) = change.token() {
                self.record_token_xfer(token, change.account(), change.units());
            }
        }
        Ok(validity)
    }

    /// Debit then credit; if either leg fails every pending token change is
    /// dropped.
    pub fn do_token_transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: i64,
    ) -> Result<ResponseCode, LedgerError> {
        let mut validity = self.adjust_token_balance(from, token, -amount)?;
        if validity.is_ok() {
            validity = self.adjust_token_balance(to, token, amount)?;
        }
        if !validity.is_ok() {
            self.drop_pending_token_changes()?;
        }
        Ok(validity)
    }

    /// Validate every leg, then stage the HBAR legs. An account may appear
    /// in more than one HBAR leg.
    ///
    /// The accounts ledger is untouched when any leg fails; token state
    /// staged by earlier legs is dropped, also when a leg errors out.
    pub fn do_zero_sum(&mut self, changes: &mut [BalanceChange]) -> Result<ResponseCode, LedgerError> {
        let mut validity = ResponseCode::Ok;
        let mut running = HashMap::new();
        for change in changes.iter_mut() {
            validity = if change.is_for_hbar() {
                self.validate_hbar_change_in_batch(change, &mut running)
            } else {
                match self.try_token_change(change) {
                    Ok(validity) => validity,
                    Err(err) => {
                        self.drop_pending_token_changes()?;
                        return Err(err);
                    }
                }
            };
            if !validity.is_ok() {
                break;
            }
        }

        if validity.is_ok() {
            self.adjust_hbar_unchecked(changes)?;
        } else {
            self.drop_pending_token_changes()?;
        }
        Ok(validity)
    }

    /// Discard staged token-relationship and NFT state, and the account
    /// properties token operations touch, keeping the transaction open.
    pub fn drop_pending_token_changes(&mut self) -> Result<(), LedgerError> {
        if let Some(rels) = self.token_rels.as_mut() {
            if rels.is_in_transaction() {
                rels.rollback()?;
                rels.begin()?;
            }
        }
        if let Some(nfts) = self.nfts.as_mut() {
            if nfts.is_in_transaction() {
                nfts.rollback()?;
                nfts.begin()?;
            }
        }
        self.accounts.undo_changes_of_type(&TOKEN_SIDE_EFFECTS);
        self.net_token_transfers.clear();
        Ok(())
    }

    pub fn is_known_treasury(&self, account: &AccountId) -> bool {
        self.token_store
            .as_ref()
            .map_or(false, |store| store.is_known_treasury(account))
    }

    // ───────────────────────── Account lifecycle ─────────────────────────

    /// Create an account funded with `balance` taken from `sponsor`.
    pub fn create(
        &mut self,
        sponsor: &AccountId,
        balance: i64,
        customizer: &AccountCustomizer,
    ) -> Result<AccountId, LedgerError> {
        let sponsor_balance = self.compute_new_balance(sponsor, -balance)?;
        let id = self.new_account_id(sponsor);
        if let Err(err) = self.spawn(&id, balance, customizer) {
            self.ids.reclaim_last_id();
            return Err(err);
        }
        self.set_balance(sponsor, sponsor_balance)?;
        self.net_transfers.update_xfers(*sponsor, -balance);
        Ok(id)
    }

    /// Create `id` holding `balance` without debiting anyone.
    pub fn spawn(
        &mut self,
        id: &AccountId,
        balance: i64,
        customizer: &AccountCustomizer,
    ) -> Result<(), LedgerError> {
        self.accounts.create(*id)?;
        self.set_balance(id, balance)?;
        customizer.customize(id, &mut self.accounts)?;
        if balance != 0 {
            self.net_transfers.update_xfers(*id, balance);
        }
        Ok(())
    }

    pub fn customize(&mut self, id: &AccountId, customizer: &AccountCustomizer) -> Result<(), LedgerError> {
        if self.is_deleted(id)? {
            return Err(LedgerError::DeletedAccount { account: *id });
        }
        customizer.customize(id, &mut self.accounts)
    }

    /// Customize even if `id` is deleted.
    pub fn customize_potentially_deleted(
        &mut self,
        id: &AccountId,
        customizer: &AccountCustomizer,
    ) -> Result<(), LedgerError> {
        customizer.customize(id, &mut self.accounts)
    }

    /// Sweep the full balance of `id` to `beneficiary`, then mark it deleted.
    pub fn delete(&mut self, id: &AccountId, beneficiary: &AccountId) -> Result<(), LedgerError> {
        let balance = self.get_balance(id)?;
        self.do_transfer(id, beneficiary, balance)?;
        self.accounts.set(id, AccountValue::IsDeleted(true))
    }

    /// Remove `id` from the ledger along with its pending net transfer.
    pub fn destroy(&mut self, id: &AccountId) -> Result<(), LedgerError> {
        self.accounts.destroy(id)?;
        self.net_transfers.remove(id);
        Ok(())
    }

    pub fn undo_creations(&mut self) {
        self.accounts.undo_creations();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::InMemoryBackingStore;
    use crate::token_store::HederaTokenStore;
    use std::cell::RefCell;
    use std::rc::Rc;
    use types::account::Token;

    const NOW: i64 = 1_700_000_000;
    const PAYER: AccountId = AccountId::from_num(2);
    const X: AccountId = AccountId::from_num(1001);
    const Y: AccountId = AccountId::from_num(1002);
    const TOKEN: TokenId = TokenId::from_num(5000);

    fn live(balance: i64) -> Account {
        Account {
            balance,
            expiry: NOW + 86_400,
            ..Account::default()
        }
    }

    fn ledger_with(accounts: Vec<(AccountId, Account)>) -> HederaLedger {
        let accounts = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(accounts)));
        let mut ledger = HederaLedger::new(accounts);
        ledger.set_consensus_time(DateTime::from_timestamp(NOW, 0).unwrap());
        ledger
    }

    fn standard() -> HederaLedger {
        ledger_with(vec![(PAYER, live(1_000)), (X, live(100)), (Y, live(0))])
    }

    fn with_tokens(ledger: HederaLedger) -> HederaLedger {
        let rels = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![
            (
                TokenRelKey::new(X, TOKEN),
                TokenRelationship {
                    balance: 10,
                    ..TokenRelationship::default()
                },
            ),
            (TokenRelKey::new(Y, TOKEN), TokenRelationship::default()),
        ])));
        let store = HederaTokenStore::new().with_token(TOKEN, Token::fungible(X));
        ledger.with_token_ledgers(rels, None, Box::new(store))
    }

    #[derive(Default)]
    struct Calls(Vec<&'static str>);

    struct RecordingHistorian(Rc<RefCell<Calls>>);

    impl RecordsHistorian for RecordingHistorian {
        fn finalize_expirable_transaction_record(&mut self) {
            self.0.borrow_mut().0.push("finalize");
        }
        fn save_expirable_transaction_record(&mut self) {
            self.0.borrow_mut().0.push("save");
        }
        fn note_new_expiration_events(&mut self) {
            self.0.borrow_mut().0.push("note");
        }
    }

    #[test]
    fn test_do_transfers_and_net_list() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        ledger
            .do_transfers(&TransferList::from_pairs(&[(X, -50), (Y, 50)]))
            .unwrap();
        assert_eq!(
            ledger.net_transfers_in_txn(),
            TransferList::from_pairs(&[(X, -50), (Y, 50)])
        );
        ledger.commit().unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 50);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 50);
        assert!(ledger.net_transfers_in_txn().is_empty());
    }

    #[test]
    fn test_do_transfers_rejects_non_zero_list() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        assert_eq!(
            ledger.do_transfers(&TransferList::from_pairs(&[(X, -50), (Y, 40)])),
            Err(LedgerError::NonZeroNetTransfers { net: -10 })
        );
    }

    #[test]
    fn test_do_transfers_is_all_or_nothing() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let result = ledger.do_transfers(&TransferList::from_pairs(&[(Y, 150), (X, -150)]));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(ledger.get_balance(&Y).unwrap(), 0);
        assert!(ledger.net_transfers_in_txn().is_empty());
    }

    #[test]
    fn test_repeated_account_in_transfers_accumulates() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        ledger
            .do_transfers(&TransferList::from_pairs(&[(X, -60), (Y, 60), (X, -40), (Y, 40)]))
            .unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 0);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 100);
    }

    #[test]
    fn test_adjust_balance_insufficient_funds() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        assert_eq!(
            ledger.adjust_balance(&X, -150),
            Err(LedgerError::InsufficientFunds {
                account: X,
                balance: 100,
                adjustment: -150
            })
        );
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_deleted_and_detached_accounts() {
        let mut deleted = live(10);
        deleted.deleted = true;
        let detached = Account {
            balance: 0,
            expiry: NOW - 1,
            ..Account::default()
        };
        let d = AccountId::from_num(3000);
        let e = AccountId::from_num(3001);
        let mut ledger = ledger_with(vec![(d, deleted), (e, detached), (X, live(100))]);
        ledger.begin().unwrap();
        assert_eq!(
            ledger.adjust_balance(&d, 1),
            Err(LedgerError::DeletedAccount { account: d })
        );
        assert_eq!(
            ledger.do_transfer(&X, &e, 5),
            Err(LedgerError::DetachedAccount { account: e })
        );
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_commit_rejects_inconsistent_adjustments() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        ledger.adjust_balance(&X, -10).unwrap();
        assert_eq!(
            ledger.commit(),
            Err(LedgerError::InconsistentAdjustments { net: -10 })
        );
        ledger.rollback().unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_commit_drives_historian_in_order() {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let mut ledger = standard().with_historian(Box::new(RecordingHistorian(Rc::clone(&calls))));
        ledger.begin().unwrap();
        ledger.do_transfer(&X, &Y, 1).unwrap();
        ledger.commit().unwrap();
        assert_eq!(calls.borrow().0, vec!["finalize", "save", "note"]);
    }

    #[test]
    fn test_opposite_legs_vanish_from_net_list() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        ledger.adjust_balance(&X, 30).unwrap();
        ledger.adjust_balance(&X, -30).unwrap();
        assert!(ledger.net_transfers_in_txn().is_empty());
        ledger.commit().unwrap();
    }

    #[test]
    fn test_create_debits_sponsor() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let id = ledger
            .create(&PAYER, 200, &AccountCustomizer::new().memo("new").expiry(NOW + 10))
            .unwrap();
        assert_eq!(ledger.get_balance(&id).unwrap(), 200);
        assert_eq!(ledger.get_balance(&PAYER).unwrap(), 800);
        ledger.commit().unwrap();
        assert!(ledger.exists(&id));
        assert_eq!(
            ledger.accounts().get(&id, AccountProperty::Memo).unwrap(),
            AccountValue::Memo("new".into())
        );
    }

    #[test]
    fn test_create_with_insufficient_sponsor_fails_cleanly() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let result = ledger.create(&X, 500, &AccountCustomizer::new());
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert!(ledger.accounts().pending_changes().is_empty());
    }

    #[test]
    fn test_customize_refuses_deleted_account() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        ledger.delete(&X, &Y).unwrap();
        assert_eq!(ledger.get_balance(&Y).unwrap(), 100);
        assert!(ledger.is_deleted(&X).unwrap());

        let customizer = AccountCustomizer::new().memo("late");
        assert_eq!(
            ledger.customize(&X, &customizer),
            Err(LedgerError::DeletedAccount { account: X })
        );
        ledger.customize_potentially_deleted(&X, &customizer).unwrap();
        ledger.commit().unwrap();
    }

    #[test]
    fn test_destroy_forgets_net_transfer() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let doomed = AccountId::from_num(4000);
        ledger
            .spawn(&doomed, 0, &AccountCustomizer::new().expiry(NOW + 10))
            .unwrap();
        ledger.adjust_balance(&doomed, 5).unwrap();
        ledger.adjust_balance(&PAYER, -5).unwrap();
        ledger.destroy(&doomed).unwrap();
        assert!(!ledger.exists(&doomed));
        assert_eq!(ledger.net_transfers_in_txn(), TransferList::from_pairs(&[(PAYER, -5)]));
    }

    #[test]
    fn test_token_transfer_moves_units() {
        let mut ledger = with_tokens(standard());
        ledger.begin().unwrap();
        assert_eq!(
            ledger.do_token_transfer(&TOKEN, &X, &Y, 4).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(ledger.get_token_balance(&X, &TOKEN).unwrap(), 6);
        assert_eq!(ledger.get_token_balance(&Y, &TOKEN).unwrap(), 4);
        assert_eq!(ledger.net_token_transfers_in_txn().len(), 1);
        ledger.commit().unwrap();
        assert_eq!(ledger.get_token_balance(&Y, &TOKEN).unwrap(), 4);
    }

    #[test]
    fn test_failed_token_transfer_drops_pending_token_changes() {
        let mut ledger = with_tokens(standard());
        ledger.begin().unwrap();
        assert_eq!(
            ledger.do_token_transfer(&TOKEN, &X, &PAYER, 4).unwrap(),
            ResponseCode::TokenNotAssociatedToAccount
        );
        assert_eq!(ledger.get_token_balance(&X, &TOKEN).unwrap(), 10);
        assert!(ledger.net_token_transfers_in_txn().is_empty());
        assert!(ledger.token_rels().map_or(false, |r| r.is_in_transaction()));
    }

    #[test]
    fn test_token_ops_without_token_ledgers() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        assert_eq!(
            ledger.grant_kyc(&X, &TOKEN),
            Err(LedgerError::TokenLedgersUnavailable)
        );
        assert!(!ledger.is_known_treasury(&X));
    }

    #[test]
    fn test_do_zero_sum_validates_before_applying() {
        let mut ledger = with_tokens(standard());
        ledger.begin().unwrap();
        let mut changes = vec![
            BalanceChange::hbar_adjust(X, -20),
            BalanceChange::hbar_adjust(Y, 20),
            BalanceChange::token_adjust(TOKEN, X, -3),
            BalanceChange::token_adjust(TOKEN, Y, 3),
            BalanceChange::token_adjust(TOKEN, PAYER, 0),
        ];
        assert_eq!(
            ledger.do_zero_sum(&mut changes).unwrap(),
            ResponseCode::TokenNotAssociatedToAccount
        );
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
        assert_eq!(ledger.get_token_balance(&X, &TOKEN).unwrap(), 10);

        changes.pop();
        assert_eq!(ledger.do_zero_sum(&mut changes).unwrap(), ResponseCode::Ok);
        assert_eq!(ledger.get_balance(&X).unwrap(), 80);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 20);
        assert_eq!(ledger.get_token_balance(&Y, &TOKEN).unwrap(), 3);
        ledger.commit().unwrap();
    }

    #[test]
    fn test_do_zero_sum_repeated_account_keeps_value() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let mut changes = vec![BalanceChange::hbar_adjust(X, 30), BalanceChange::hbar_adjust(X, -30)];
        assert_eq!(ledger.do_zero_sum(&mut changes).unwrap(), ResponseCode::Ok);
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
        ledger.commit().unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_do_zero_sum_repeated_debits_share_one_balance() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let mut changes = vec![
            BalanceChange::hbar_adjust(X, -60),
            BalanceChange::hbar_adjust(X, -60),
            BalanceChange::hbar_adjust(Y, 120),
        ];
        assert_eq!(
            ledger.do_zero_sum(&mut changes).unwrap(),
            ResponseCode::InsufficientAccountBalance
        );
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 0);

        let mut changes = vec![
            BalanceChange::hbar_adjust(X, -60),
            BalanceChange::hbar_adjust(Y, 100),
            BalanceChange::hbar_adjust(X, -40),
        ];
        assert_eq!(ledger.do_zero_sum(&mut changes).unwrap(), ResponseCode::Ok);
        ledger.commit().unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 0);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 100);
    }

    #[test]
    fn test_do_zero_sum_token_error_stages_nothing() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let mut changes = vec![BalanceChange::hbar_adjust(X, -3), BalanceChange::token_adjust(TOKEN, X, -3)];
        assert_eq!(
            ledger.do_zero_sum(&mut changes),
            Err(LedgerError::TokenLedgersUnavailable)
        );
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
        assert!(ledger.net_transfers_in_txn().is_empty());
    }

    #[test]
    fn test_create_skips_numbers_in_use() {
        let mut ledger = standard();
        ledger.begin().unwrap();
        let id = ledger
            .create(&PAYER, 10, &AccountCustomizer::new().expiry(NOW + 10))
            .unwrap();
        assert_eq!(id, AccountId::from_num(1003));
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
        assert_eq!(ledger.get_balance(&id).unwrap(), 10);
        ledger.commit().unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_failed_spawn_gives_number_back() {
        let mut ledger = standard();
        assert_eq!(
            ledger.create(&PAYER, 10, &AccountCustomizer::new()),
            Err(LedgerError::NoActiveTransaction)
        );
        ledger.begin().unwrap();
        let id = ledger
            .create(&PAYER, 10, &AccountCustomizer::new().expiry(NOW + 10))
            .unwrap();
        assert_eq!(id, AccountId::from_num(1003));
    }

    #[test]
    fn test_new_account_id_skips_destroyed_number() {
        let mut ledger = ledger_with(vec![(PAYER, live(1_000)), (X, live(0))])
            .with_id_source(Box::new(SequentialIdSource::new(1001)));
        ledger.begin().unwrap();
        ledger.destroy(&X).unwrap();
        assert_eq!(ledger.new_account_id(&PAYER), AccountId::from_num(1002));
    }

    #[test]
    fn test_validate_hbar_change_missing_account() {
        let ledger = standard();
        let mut change = BalanceChange::hbar_adjust(AccountId::from_num(777), 1);
        assert_eq!(ledger.validate_hbar_change(&mut change), ResponseCode::InvalidAccountId);
    }
}
