//! Atomic multi-party, cross-asset transfers
//!
//! `TransferLogic::transfer` validates every leg before applying any HBAR
//! leg. Token legs stage their state while validating; if a later leg fails
//! that state is dropped and any accounts auto-created along the way are
//! undone, so the transfer is all-or-nothing across the accounts, token
//! relationship and NFT ledgers.

use std::collections::HashMap;

use tracing::{debug, warn};
use types::ids::AccountId;
use types::response::ResponseCode;
use types::transfer::{TokenTransferList, TransferList};

use crate::auto_creation::AutoCreation;
use crate::balance_change::BalanceChange;
use crate::config::LedgerConfig;
use crate::errors::LedgerError;
use crate::hedera_ledger::HederaLedger;
use crate::semantic_checks::PureTransferSemanticChecks;

pub struct TransferLogic {
    config: LedgerConfig,
    checks: PureTransferSemanticChecks,
    auto_creation: Option<Box<dyn AutoCreation>>,
}

impl TransferLogic {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            checks: PureTransferSemanticChecks::new(),
            auto_creation: None,
        }
    }

    pub fn with_auto_creation(mut self, auto_creation: Box<dyn AutoCreation>) -> Self {
        self.auto_creation = Some(auto_creation);
        self
    }

    pub fn auto_creation(&self) -> Option<&dyn AutoCreation> {
        self.auto_creation.as_deref()
    }

    /// Forget auto-creations once their transaction has committed.
    pub fn reset_auto_creations(&mut self) {
        if let Some(auto_creation) = self.auto_creation.as_mut() {
            auto_creation.reset();
        }
    }

    /// Run the pure checks over a transfer body, then apply it.
    pub fn transfer_lists(
        &mut self,
        ledger: &mut HederaLedger,
        hbar_adjusts: &TransferList,
        token_adjusts: &[TokenTransferList],
    ) -> Result<(), LedgerError> {
        let validity =
            self.checks
                .full_pure_validation(hbar_adjusts, token_adjusts, &self.config.validation_props());
        if !validity.is_ok() {
            return Err(LedgerError::InvalidTransaction(validity));
        }
        self.transfer(ledger, changes_from(hbar_adjusts, token_adjusts))
    }

    /// Validate all legs, then apply the HBAR legs; on any failure nothing
    /// staged by this call survives.
    pub fn transfer(
        &mut self,
        ledger: &mut HederaLedger,
        changes: Vec<BalanceChange>,
    ) -> Result<(), LedgerError> {
        let mut changes = aggregate(self.resolve_linked_aliases(changes));
        let validity = match self.validate_legs(&mut changes, ledger) {
            Ok(validity) => validity,
            Err(err) => {
                self.unwind(ledger)?;
                warn!(error = %err, "Transfer aborted");
                return Err(err);
            }
        };

        if validity.is_ok() {
            ledger.adjust_hbar_unchecked(&changes)?;
            debug!(legs = changes.len(), "Applied transfer");
            return Ok(());
        }

        self.unwind(ledger)?;
        warn!(code = %validity, "Transfer failed validation");
        Err(LedgerError::InvalidTransaction(validity))
    }

    /// Point legs whose alias is already linked at the linked account, so
    /// they merge with legs naming that account directly.
    fn resolve_linked_aliases(&self, mut changes: Vec<BalanceChange>) -> Vec<BalanceChange> {
        let Some(auto_creation) = self.auto_creation.as_deref() else {
            return changes;
        };
        for change in changes.iter_mut().filter(|c| c.has_unresolved_alias()) {
            if let Some(account) = change.alias().and_then(|alias| auto_creation.resolve(alias)) {
                change.replace_alias_with(account);
            }
        }
        changes
    }

    fn validate_legs(
        &mut self,
        changes: &mut Vec<BalanceChange>,
        ledger: &mut HederaLedger,
    ) -> Result<ResponseCode, LedgerError> {
        let mut running = HashMap::new();
        let mut auto_creation_fee = 0i64;
        for change in changes.iter_mut() {
            let validity = if change.has_unresolved_alias() {
                let (validity, fee) = self.create_for_alias(change, ledger)?;
                auto_creation_fee += fee;
                validity
            } else if change.is_for_hbar() {
                ledger.validate_hbar_change_in_batch(change, &mut running)
            } else {
                ledger.try_token_change(change)?
            };
            if !validity.is_ok() {
                return Ok(validity);
            }
        }

        if auto_creation_fee > 0 {
            return Ok(self.charge_creation_fee(changes, ledger, auto_creation_fee));
        }
        Ok(ResponseCode::Ok)
    }

    fn create_for_alias(
        &mut self,
        change: &mut BalanceChange,
        ledger: &mut HederaLedger,
    ) -> Result<(ResponseCode, i64), LedgerError> {
        match self.auto_creation.as_mut() {
            Some(auto_creation) => auto_creation.create(change, ledger),
            None => Ok((ResponseCode::InvalidAccountId, 0)),
        }
    }

    /// Drop staged token state and undo this transfer's auto-creations.
    fn unwind(&mut self, ledger: &mut HederaLedger) -> Result<(), LedgerError> {
        ledger.drop_pending_token_changes()?;
        if let Some(auto_creation) = self.auto_creation.as_mut() {
            if auto_creation.reclaim_pending_aliases() {
                ledger.undo_creations();
            }
        }
        Ok(())
    }

    /// Credit the accumulated creation fee to the funding account, folding
    /// it into that account's existing HBAR leg if there is one.
    fn charge_creation_fee(
        &self,
        changes: &mut Vec<BalanceChange>,
        ledger: &HederaLedger,
        fee: i64,
    ) -> ResponseCode {
        let funding = self.config.funding_account;
        let existing = changes
            .iter()
            .position(|c| c.is_for_hbar() && !c.has_unresolved_alias() && c.account() == funding);
        let index = match existing {
            Some(index) => {
                changes[index].aggregate_units(fee);
                index
            }
            None => {
                changes.push(BalanceChange::hbar_adjust(funding, fee));
                changes.len() - 1
            }
        };
        ledger.validate_hbar_change(&mut changes[index])
    }
}

/// Merge legs moving the same asset for the same account or alias, keeping
/// first-seen order.
pub fn aggregate(changes: Vec<BalanceChange>) -> Vec<BalanceChange> {
    let mut merged: Vec<BalanceChange> = Vec::with_capacity(changes.len());
    for change in changes {
        match merged.iter_mut().find(|m| m.merges_with(&change)) {
            Some(existing) => existing.aggregate_units(change.units()),
            None => merged.push(change),
        }
    }
    merged
}

/// Balance changes described by a transfer body, HBAR legs first.
pub fn changes_from(hbar_adjusts: &TransferList, token_adjusts: &[TokenTransferList]) -> Vec<BalanceChange> {
    let mut changes: Vec<BalanceChange> = hbar_adjusts
        .account_amounts
        .iter()
        .map(|aa| BalanceChange::hbar_adjust(aa.account, aa.amount))
        .collect();
    for list in token_adjusts {
        changes.extend(
            list.transfers
                .iter()
                .map(|aa| BalanceChange::token_adjust(list.token, aa.account, aa.amount)),
        );
        changes.extend(list.nft_transfers.iter().map(|xfer| {
            BalanceChange::nft_ownership_change(list.token, xfer.sender, xfer.receiver, xfer.serial)
        }));
    }
    changes
}

/// HBAR legs of a payer-funded transfer: `payer` pays `amount` to `to`, and
/// overdrawing reports `InsufficientPayerBalance`.
pub fn payer_transfer(payer: AccountId, to: AccountId, amount: i64) -> Vec<BalanceChange> {
    vec![
        BalanceChange::hbar_adjust(payer, -amount)
            .with_insufficient_balance_code(ResponseCode::InsufficientPayerBalance),
        BalanceChange::hbar_adjust(to, amount),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto_creation::AutoCreationLogic;
    use crate::backing::InMemoryBackingStore;
    use crate::transactional::TransactionalLedger;
    use chrono::DateTime;
    use types::account::{Account, Token, TokenRelationship};
    use types::ids::{TokenId, TokenRelKey};
    use types::transfer::AccountAmount;

    const NOW: i64 = 1_700_000_000;
    const FUNDING: AccountId = AccountId::from_num(98);
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

    fn config() -> LedgerConfig {
        LedgerConfig {
            auto_creation_fee: 10,
            ..LedgerConfig::default()
        }
    }

    fn ledger() -> HederaLedger {
        let accounts = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![
            (FUNDING, live(0)),
            (X, live(100)),
            (Y, live(0)),
        ])));
        let rels = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![(
            TokenRelKey::new(X, TOKEN),
            TokenRelationship {
                balance: 10,
                ..TokenRelationship::default()
            },
        )])));
        let store = crate::token_store::HederaTokenStore::new().with_token(TOKEN, Token::fungible(X));
        let mut ledger = HederaLedger::with_config(accounts, config()).with_token_ledgers(
            rels,
            None,
            Box::new(store),
        );
        ledger.set_consensus_time(DateTime::from_timestamp(NOW, 0).unwrap());
        ledger.begin().unwrap();
        ledger
    }

    fn logic() -> TransferLogic {
        TransferLogic::new(config()).with_auto_creation(Box::new(AutoCreationLogic::new(&config())))
    }

    #[test]
    fn test_aggregate_merges_same_account() {
        let merged = aggregate(vec![
            BalanceChange::hbar_adjust(X, -10),
            BalanceChange::hbar_adjust(Y, 10),
            BalanceChange::hbar_adjust(X, -5),
            BalanceChange::token_adjust(TOKEN, X, -5),
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].units(), -15);
        assert!(merged[2].is_for_fungible_token());
    }

    #[test]
    fn test_transfer_applies_hbar_legs() {
        let mut ledger = ledger();
        logic().transfer(&mut ledger, payer_transfer(X, Y, 40)).unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 60);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 40);
        ledger.commit().unwrap();
    }

    #[test]
    fn test_payer_overdraft_code() {
        let mut ledger = ledger();
        assert_eq!(
            logic().transfer(&mut ledger, payer_transfer(X, Y, 400)),
            Err(LedgerError::InvalidTransaction(ResponseCode::InsufficientPayerBalance))
        );
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_failed_hbar_leg_drops_token_leg() {
        let mut ledger = ledger();
        let changes = vec![
            BalanceChange::token_adjust(TOKEN, X, -3),
            BalanceChange::token_adjust(TOKEN, X, 0),
            BalanceChange::hbar_adjust(Y, -1),
            BalanceChange::hbar_adjust(X, 1),
        ];
        assert_eq!(
            logic().transfer(&mut ledger, changes),
            Err(LedgerError::InvalidTransaction(ResponseCode::InsufficientAccountBalance))
        );
        assert_eq!(ledger.get_token_balance(&X, &TOKEN).unwrap(), 10);
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_auto_creation_charges_funding_account() {
        let mut ledger = ledger();
        let mut logic = logic();
        let changes = vec![
            BalanceChange::hbar_adjust(X, -50),
            BalanceChange::hbar_to_alias(b"alias".to_vec(), 50),
        ];
        logic.transfer(&mut ledger, changes).unwrap();

        let created = logic
            .auto_creation()
            .and_then(|a| a.resolve(b"alias"))
            .unwrap();
        assert_eq!(created, AccountId::from_num(1003));
        assert_eq!(ledger.get_balance(&created).unwrap(), 40);
        assert_eq!(ledger.get_balance(&FUNDING).unwrap(), 10);
        assert_eq!(ledger.get_balance(&X).unwrap(), 50);
        assert_eq!(ledger.net_transfers_in_txn().net(), 0);
        ledger.commit().unwrap();
        logic.reset_auto_creations();
        assert!(ledger.exists(&created));
    }

    #[test]
    fn test_known_alias_resolves_without_fee() {
        let mut ledger = ledger();
        let mut auto = AutoCreationLogic::new(&config());
        auto.link(b"y".to_vec(), Y);
        let mut logic = TransferLogic::new(config()).with_auto_creation(Box::new(auto));
        logic
            .transfer(
                &mut ledger,
                vec![
                    BalanceChange::hbar_adjust(X, -5),
                    BalanceChange::hbar_to_alias(b"y".to_vec(), 5),
                ],
            )
            .unwrap();
        assert_eq!(ledger.get_balance(&Y).unwrap(), 5);
        assert_eq!(ledger.get_balance(&FUNDING).unwrap(), 0);
    }

    #[test]
    fn test_linked_alias_merges_with_account_leg() {
        let mut ledger = ledger();
        let mut auto = AutoCreationLogic::new(&config());
        auto.link(b"y".to_vec(), Y);
        let mut logic = TransferLogic::new(config()).with_auto_creation(Box::new(auto));
        logic
            .transfer(
                &mut ledger,
                vec![
                    BalanceChange::hbar_adjust(X, -10),
                    BalanceChange::hbar_adjust(Y, 5),
                    BalanceChange::hbar_to_alias(b"y".to_vec(), 5),
                ],
            )
            .unwrap();
        assert_eq!(ledger.get_balance(&X).unwrap(), 90);
        assert_eq!(ledger.get_balance(&Y).unwrap(), 10);
        assert_eq!(ledger.net_transfers_in_txn(), TransferList::from_pairs(&[(X, -10), (Y, 10)]));
        ledger.commit().unwrap();
        assert_eq!(ledger.get_balance(&Y).unwrap(), 10);
    }

    #[test]
    fn test_leg_error_undoes_auto_creation() {
        let accounts = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![
            (FUNDING, live(0)),
            (X, live(100)),
        ])));
        let mut ledger = HederaLedger::with_config(accounts, config());
        ledger.set_consensus_time(DateTime::from_timestamp(NOW, 0).unwrap());
        ledger.begin().unwrap();

        let mut logic = logic();
        let changes = vec![
            BalanceChange::hbar_to_alias(b"alias".to_vec(), 50),
            BalanceChange::hbar_adjust(X, -50),
            BalanceChange::token_adjust(TOKEN, X, -1),
        ];
        assert_eq!(
            logic.transfer(&mut ledger, changes),
            Err(LedgerError::TokenLedgersUnavailable)
        );
        assert_eq!(logic.auto_creation().and_then(|a| a.resolve(b"alias")), None);
        assert!(ledger.accounts().pending_changes().is_empty());
        assert_eq!(ledger.get_balance(&X).unwrap(), 100);
    }

    #[test]
    fn test_failed_transfer_undoes_auto_creation() {
        let mut ledger = ledger();
        let mut logic = logic();
        let changes = vec![
            BalanceChange::hbar_to_alias(b"alias".to_vec(), 50),
            BalanceChange::hbar_adjust(Y, -50),
        ];
        assert_eq!(
            logic.transfer(&mut ledger, changes),
            Err(LedgerError::InvalidTransaction(ResponseCode::InsufficientAccountBalance))
        );
        assert_eq!(logic.auto_creation().and_then(|a| a.resolve(b"alias")), None);
        assert!(ledger.accounts().pending_changes().is_empty());
    }

    #[test]
    fn test_alias_without_auto_creation_is_invalid() {
        let mut ledger = ledger();
        let changes = vec![
            BalanceChange::hbar_adjust(X, -5),
            BalanceChange::hbar_to_alias(b"a".to_vec(), 5),
        ];
        assert_eq!(
            TransferLogic::new(config()).transfer(&mut ledger, changes),
            Err(LedgerError::InvalidTransaction(ResponseCode::InvalidAccountId))
        );
    }

    #[test]
    fn test_transfer_lists_runs_pure_checks_first() {
        let mut ledger = ledger();
        let unbalanced = TransferList::from_pairs(&[(X, -5), (Y, 4)]);
        assert_eq!(
            logic().transfer_lists(&mut ledger, &unbalanced, &[]),
            Err(LedgerError::InvalidTransaction(ResponseCode::InvalidAccountAmounts))
        );

        let tokens = vec![TokenTransferList::fungible(
            TOKEN,
            vec![AccountAmount::new(X, -2), AccountAmount::new(Y, 2)],
        )];
        assert_eq!(
            logic().transfer_lists(&mut ledger, &TransferList::default(), &tokens),
            Err(LedgerError::InvalidTransaction(ResponseCode::TokenNotAssociatedToAccount))
        );
    }
}
