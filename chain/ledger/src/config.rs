//! Ledger configuration
//!
//! Network-level knobs consumed by transfer validation, auto-creation and the
//! detached-account rule. Deserializes with every field optional.

use serde::{Deserialize, Serialize};
use types::ids::AccountId;

/// Limits and feature switches for pure transfer-list validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationProps {
    pub max_hbar_adjusts: usize,
    pub max_token_adjusts: usize,
    pub max_ownership_changes: usize,
    pub nfts_enabled: bool,
    pub allowances_enabled: bool,
    pub auto_creation_enabled: bool,
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum number of HBAR adjustments in one transfer list
    pub max_hbar_adjusts: usize,
    /// Maximum number of token lists, and of fungible adjustments across them
    pub max_token_adjusts: usize,
    /// Maximum number of NFT ownership changes in one transaction
    pub max_ownership_changes: usize,
    pub nfts_enabled: bool,
    pub allowances_enabled: bool,
    pub auto_creation_enabled: bool,
    /// Account credited with auto-creation fees
    pub funding_account: AccountId,
    /// Tinybars charged for auto-creating an account from an alias
    pub auto_creation_fee: i64,
    /// Auto-renew period given to auto-created accounts
    pub auto_renew_period_secs: i64,
    /// Zero-balance expired accounts are detached when set
    pub expire_accounts: bool,
    /// Zero-balance expired contracts are detached when set
    pub expire_contracts: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_hbar_adjusts: 10,
            max_token_adjusts: 10,
            max_ownership_changes: 10,
            nfts_enabled: true,
            allowances_enabled: true,
            auto_creation_enabled: true,
            funding_account: AccountId::from_num(98),
            auto_creation_fee: 0,
            auto_renew_period_secs: 7_776_000,
            expire_accounts: true,
            expire_contracts: true,
        }
    }
}

impl LedgerConfig {
    pub fn validation_props(&self) -> ValidationProps {
        ValidationProps {
            max_hbar_adjusts: self.max_hbar_adjusts,
            max_token_adjusts: self.max_token_adjusts,
            max_ownership_changes: self.max_ownership_changes,
            nfts_enabled: self.nfts_enabled,
            allowances_enabled: self.allowances_enabled,
            auto_creation_enabled: self.auto_creation_enabled,
        }
    }

    /// Whether an expired, zero-balance entity of this kind is detached.
    pub fn expires(&self, smart_contract: bool) -> bool {
        if smart_contract {
            self.expire_contracts
        } else {
            self.expire_accounts
        }
    }
}
