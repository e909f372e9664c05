//! Account, token and token-relationship records
//!
//! These are the materialized entity states held by a backing store. Every
//! record is default-constructible so a ledger can materialize a freshly
//! created key before any property has been staged on it.

use crate::ids::{AccountId, TokenId};
use serde::{Deserialize, Serialize};

/// Durable state of one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Balance in tinybars
    pub balance: i64,
    /// Consensus second at which the account expires
    pub expiry: i64,
    pub deleted: bool,
    pub smart_contract: bool,
    pub auto_renew_period: i64,
    /// Tokens this account is associated with, in association order
    pub tokens: Vec<TokenId>,
    pub proxy: Option<AccountId>,
    pub memo: String,
    /// Alias bytes this account was auto-created under (empty if none)
    pub alias: Vec<u8>,
    pub receiver_sig_required: bool,
    pub max_auto_associations: i32,
    pub used_auto_associations: i32,
    pub num_nfts_owned: i64,
}

impl Account {
    /// Create a live account holding `balance`
    pub fn with_balance(balance: i64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    pub fn is_associated_with(&self, token: &TokenId) -> bool {
        self.tokens.contains(token)
    }

    pub fn has_alias(&self) -> bool {
        !self.alias.is_empty()
    }

    /// Whether an automatic association slot is still free
    pub fn has_free_auto_association(&self) -> bool {
        self.used_auto_associations < self.max_auto_associations
    }
}

/// Fungible or non-fungible token type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    #[default]
    FungibleCommon,
    NonFungibleUnique,
}

/// Definition of a token type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub treasury: AccountId,
    pub decimals: u32,
    pub deleted: bool,
    pub paused: bool,
    /// Whether the token has a freeze key (freeze/unfreeze permitted)
    pub has_freeze_key: bool,
    /// Whether the token has a KYC key (KYC must be granted before transfers)
    pub has_kyc_key: bool,
    /// New relationships start frozen when set
    pub freeze_default: bool,
}

impl Token {
    pub fn fungible(treasury: AccountId) -> Self {
        Self {
            treasury,
            ..Self::default()
        }
    }

    pub fn non_fungible(treasury: AccountId) -> Self {
        Self {
            token_type: TokenType::NonFungibleUnique,
            treasury,
            ..Self::default()
        }
    }

    pub fn is_fungible(&self) -> bool {
        self.token_type == TokenType::FungibleCommon
    }
}

/// Balance and flags of one account's association with one token
///
/// For a non-fungible token the balance counts owned serials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRelationship {
    pub balance: i64,
    pub frozen: bool,
    pub kyc_granted: bool,
    pub automatic_association: bool,
}

/// One minted serial of a non-fungible token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueToken {
    pub owner: AccountId,
    pub metadata: Vec<u8>,
}
