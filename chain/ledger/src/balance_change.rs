//! One pending adjustment of a transfer
//!
//! A leg moves native currency (no token), fungible token units, or one NFT
//! serial. HBAR legs may name their account by alias until auto-creation
//! resolves it. Validation stores the resolved new balance on the leg so the
//! apply phase never re-reads it.

use types::ids::{AccountId, NftId, TokenId};
use types::response::ResponseCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NftLeg {
    serial: i64,
    counterparty: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    token: Option<TokenId>,
    account: AccountId,
    alias: Option<Vec<u8>>,
    units: i64,
    new_balance: Option<i64>,
    code_for_insufficient_balance: ResponseCode,
    nft: Option<NftLeg>,
}

impl BalanceChange {
    pub fn hbar_adjust(account: AccountId, units: i64) -> Self {
        Self {
            token: None,
            account,
            alias: None,
            units,
            new_balance: None,
            code_for_insufficient_balance: ResponseCode::InsufficientAccountBalance,
            nft: None,
        }
    }

    /// HBAR credit to an account known only by its alias
    pub fn hbar_to_alias(alias: Vec<u8>, units: i64) -> Self {
        Self {
            alias: Some(alias),
            ..Self::hbar_adjust(AccountId::MISSING, units)
        }
    }

    pub fn token_adjust(token: TokenId, account: AccountId, units: i64) -> Self {
        Self {
            token: Some(token),
            code_for_insufficient_balance: ResponseCode::InsufficientTokenBalance,
            ..Self::hbar_adjust(account, units)
        }
    }

    /// Move `serial` of `token` from `sender` to `receiver`
    pub fn nft_ownership_change(
        token: TokenId,
        sender: AccountId,
        receiver: AccountId,
        serial: i64,
    ) -> Self {
        Self {
            token: Some(token),
            units: 1,
            code_for_insufficient_balance: ResponseCode::SenderDoesNotOwnNftSerialNo,
            nft: Some(NftLeg {
                serial,
                counterparty: receiver,
            }),
            ..Self::hbar_adjust(sender, 0)
        }
    }

    /// Override the code reported when this leg would overdraw its account,
    /// e.g. `InsufficientPayerBalance` for the payer's leg.
    pub fn with_insufficient_balance_code(mut self, code: ResponseCode) -> Self {
        self.code_for_insufficient_balance = code;
        self
    }

    pub fn is_for_hbar(&self) -> bool {
        self.token.is_none()
    }

    pub fn is_for_nft(&self) -> bool {
        self.nft.is_some()
    }

    pub fn is_for_fungible_token(&self) -> bool {
        self.token.is_some() && self.nft.is_none()
    }

    pub fn token(&self) -> Option<TokenId> {
        self.token
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn alias(&self) -> Option<&[u8]> {
        self.alias.as_deref()
    }

    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn serial(&self) -> Option<i64> {
        self.nft.map(|n| n.serial)
    }

    /// Receiver of an NFT leg
    pub fn counterparty(&self) -> Option<AccountId> {
        self.nft.map(|n| n.counterparty)
    }

    pub fn nft_id(&self) -> Option<NftId> {
        match (self.token, self.nft) {
            (Some(token), Some(nft)) => Some(NftId::new(token, nft.serial)),
            _ => None,
        }
    }

    pub fn new_balance(&self) -> Option<i64> {
        self.new_balance
    }

    pub fn set_new_balance(&mut self, balance: i64) {
        self.new_balance = Some(balance);
    }

    pub fn code_for_insufficient_balance(&self) -> ResponseCode {
        self.code_for_insufficient_balance
    }

    pub fn has_unresolved_alias(&self) -> bool {
        self.alias.is_some() && !self.account.is_set()
    }

    pub fn replace_alias_with(&mut self, account: AccountId) {
        self.account = account;
        self.alias = None;
    }

    /// Fold another leg's units for the same asset and account into this one.
    pub fn aggregate_units(&mut self, units: i64) {
        self.units = self.units.saturating_add(units);
    }

    /// Shift the units this leg moves, e.g. to deduct a creation fee.
    pub fn adjust_units(&mut self, delta: i64) {
        self.units = self.units.saturating_add(delta);
    }

    /// Whether `other` moves the same asset for the same account or alias, so
    /// the two can be aggregated. NFT legs never merge.
    pub fn merges_with(&self, other: &BalanceChange) -> bool {
        self.nft.is_none()
            && other.nft.is_none()
            && self.token == other.token
            && self.account == other.account
            && self.alias == other.alias
    }
}
