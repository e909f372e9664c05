//! Identifier types for ledger entities
//!
//! Accounts and tokens are addressed by a `shard.realm.num` triple. The
//! derived ordering (shard, then realm, then num) is the total order used
//! wherever transfer lists must be deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failure to parse a `shard.realm.num` literal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("Expected shard.realm.num, got {0:?}")]
    Format(String),

    #[error("Invalid number in {literal:?}: {part}")]
    Number { literal: String, part: String },
}

fn parse_triple(s: &str) -> Result<(u64, u64, u64), ParseIdError> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 3 {
        return Err(ParseIdError::Format(s.to_string()));
    }
    let mut nums = [0u64; 3];
    for (slot, part) in nums.iter_mut().zip(parts.iter()) {
        *slot = part.parse().map_err(|_| ParseIdError::Number {
            literal: s.to_string(),
            part: part.to_string(),
        })?;
    }
    Ok((nums[0], nums[1], nums[2]))
}

/// Unique identifier for an account
///
/// The all-zero id is the "missing" account, as an unset id field on a
/// transfer list would decode to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AccountId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl AccountId {
    /// The unset account id.
    pub const MISSING: AccountId = AccountId::new(0, 0, 0);

    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Account `0.0.num`
    pub const fn from_num(num: u64) -> Self {
        Self::new(0, 0, num)
    }

    /// Whether this id names an actual account (not the unset default).
    pub fn is_set(&self) -> bool {
        *self != Self::MISSING
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for AccountId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (shard, realm, num) = parse_triple(s)?;
        Ok(Self::new(shard, realm, num))
    }
}

/// Unique identifier for a token type
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TokenId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl TokenId {
    /// The unset token id.
    pub const MISSING: TokenId = TokenId::new(0, 0, 0);

    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    pub const fn from_num(num: u64) -> Self {
        Self::new(0, 0, num)
    }

    pub fn is_set(&self) -> bool {
        *self != Self::MISSING
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for TokenId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (shard, realm, num) = parse_triple(s)?;
        Ok(Self::new(shard, realm, num))
    }
}

/// Key of an account's relationship with a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenRelKey {
    pub account: AccountId,
    pub token: TokenId,
}

impl TokenRelKey {
    pub fn new(account: AccountId, token: TokenId) -> Self {
        Self { account, token }
    }
}

impl fmt::Display for TokenRelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.account, self.token)
    }
}

/// Unique identifier for a single non-fungible token serial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NftId {
    pub token: TokenId,
    pub serial: i64,
}

impl NftId {
    pub fn new(token: TokenId, serial: i64) -> Self {
        Self { token, serial }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.token, self.serial)
    }
}
