//! Automatic account creation for HBAR sent to an unused alias
//!
//! The first credit to an alias spawns a fresh account that takes the alias
//! as its own. The creation fee is carved out of the credited units; the
//! caller owes it to the funding account. Creations are tracked until the
//! surrounding transfer settles so a failed transfer can unlink them.

use std::collections::HashMap;

use tracing::{debug, info};
use types::ids::AccountId;
use types::response::ResponseCode;

use crate::balance_change::BalanceChange;
use crate::config::LedgerConfig;
use crate::customizer::AccountCustomizer;
use crate::errors::LedgerError;
use crate::hedera_ledger::HederaLedger;

const AUTO_MEMO: &str = "auto-created account";

pub trait AutoCreation {
    /// Account currently linked to `alias`, if any.
    fn resolve(&self, alias: &[u8]) -> Option<AccountId>;

    /// Spawn an account for the alias of `change` and rewrite the leg to
    /// credit it. Returns the validity and the fee charged.
    fn create(
        &mut self,
        change: &mut BalanceChange,
        ledger: &mut HederaLedger,
    ) -> Result<(ResponseCode, i64), LedgerError>;

    /// Unlink aliases created since the last reset; true if there were any.
    fn reclaim_pending_aliases(&mut self) -> bool;

    /// Forget pending creations, keeping their alias links.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct AutoCreationLogic {
    enabled: bool,
    fee: i64,
    auto_renew_period: i64,
    aliases: HashMap<Vec<u8>, AccountId>,
    pending: Vec<(Vec<u8>, AccountId)>,
}

impl AutoCreationLogic {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            enabled: config.auto_creation_enabled,
            fee: config.auto_creation_fee,
            auto_renew_period: config.auto_renew_period_secs,
            aliases: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Link an alias to an existing account.
    pub fn link(&mut self, alias: Vec<u8>, account: AccountId) {
        self.aliases.insert(alias, account);
    }
}

impl AutoCreation for AutoCreationLogic {
    fn resolve(&self, alias: &[u8]) -> Option<AccountId> {
        self.aliases.get(alias).copied()
    }

    fn create(
        &mut self,
        change: &mut BalanceChange,
        ledger: &mut HederaLedger,
    ) -> Result<(ResponseCode, i64), LedgerError> {
        if !self.enabled {
            return Ok((ResponseCode::NotSupported, 0));
        }
        let Some(alias) = change.alias().map(<[u8]>::to_vec) else {
            return Ok((ResponseCode::InvalidAccountId, 0));
        };
        // Only a credit can create an account
        if change.units() <= 0 {
            return Ok((ResponseCode::InvalidAccountId, 0));
        }
        if change.units() < self.fee {
            return Ok((change.code_for_insufficient_balance(), 0));
        }

        let funding = ledger.config().funding_account;
        let id = ledger.new_account_id(&funding);
        let expiry = ledger.consensus_time().timestamp() + self.auto_renew_period;
        let customizer = AccountCustomizer::new()
            .alias(alias.clone())
            .memo(AUTO_MEMO)
            .expiry(expiry)
            .auto_renew_period(self.auto_renew_period);
        if let Err(err) = ledger.spawn(&id, 0, &customizer) {
            ledger.reclaim_last_id();
            return Err(err);
        }

        change.replace_alias_with(id);
        change.adjust_units(-self.fee);
        change.set_new_balance(change.units());

        debug!(account = %id, fee = self.fee, "Auto-created account for alias");
        self.aliases.insert(alias.clone(), id);
        self.pending.push((alias, id));
        Ok((ResponseCode::Ok, self.fee))
    }

    fn reclaim_pending_aliases(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        for (alias, account) in self.pending.drain(..) {
            self.aliases.remove(&alias);
            info!(account = %account, "Reclaimed alias of failed auto-creation");
        }
        true
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}
