//! Transfer list types
//!
//! The shapes a transaction uses to describe HBAR and token movements, and
//! the shapes a ledger uses to report net transfers back.

use crate::ids::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

/// A signed adjustment of one account's balance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAmount {
    pub account: AccountId,
    pub amount: i64,
    /// Debit spends an allowance granted to the payer
    pub is_approval: bool,
}

impl AccountAmount {
    pub fn new(account: AccountId, amount: i64) -> Self {
        Self {
            account,
            amount,
            is_approval: false,
        }
    }

    pub fn approved(account: AccountId, amount: i64) -> Self {
        Self {
            account,
            amount,
            is_approval: true,
        }
    }
}

/// HBAR adjustments of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferList {
    pub account_amounts: Vec<AccountAmount>,
}

impl TransferList {
    pub fn new(account_amounts: Vec<AccountAmount>) -> Self {
        Self { account_amounts }
    }

    /// Build from `(account, amount)` pairs
    pub fn from_pairs(pairs: &[(AccountId, i64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(account, amount)| AccountAmount::new(*account, *amount))
                .collect(),
        )
    }

    pub fn net(&self) -> i64 {
        self.account_amounts.iter().map(|aa| aa.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.account_amounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.account_amounts.len()
    }
}

/// Change of ownership of one NFT serial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NftTransfer {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub serial: i64,
    pub is_approval: bool,
}

impl NftTransfer {
    pub fn new(sender: AccountId, receiver: AccountId, serial: i64) -> Self {
        Self {
            sender,
            receiver,
            serial,
            is_approval: false,
        }
    }
}

/// Adjustments scoped to a single token
///
/// A list carries either fungible `transfers` or `nft_transfers`, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferList {
    pub token: TokenId,
    pub transfers: Vec<AccountAmount>,
    pub nft_transfers: Vec<NftTransfer>,
}

impl TokenTransferList {
    pub fn fungible(token: TokenId, transfers: Vec<AccountAmount>) -> Self {
        Self {
            token,
            transfers,
            nft_transfers: Vec::new(),
        }
    }

    pub fn non_fungible(token: TokenId, nft_transfers: Vec<NftTransfer>) -> Self {
        Self {
            token,
            transfers: Vec::new(),
            nft_transfers,
        }
    }
}
