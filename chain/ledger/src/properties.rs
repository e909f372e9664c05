//! Typed property tables
//!
//! Each entity kind has a closed property enumeration and a matching value
//! union whose variant names the property it carries. Staging a value
//! therefore cannot target the wrong property, and reading a property goes
//! through one exhaustive match per entity kind.

use std::fmt::Debug;
use std::hash::Hash;

use types::account::{Account, TokenRelationship, UniqueToken};
use types::ids::{AccountId, TokenId};

/// A property of some entity kind
pub trait LedgerProperty: Copy + Eq + Hash + Ord + Debug + 'static {
    /// Every property of the kind, in application order.
    fn all() -> &'static [Self];
}

/// A value tagged with the property it belongs to
pub trait PropertyValue: Clone + Debug + PartialEq {
    type Property: LedgerProperty;

    fn property(&self) -> Self::Property;
}

/// An entity kind a `TransactionalLedger` can stage changes for
pub trait LedgerEntity: Clone + Default + Debug {
    type Property: LedgerProperty;
    type Value: PropertyValue<Property = Self::Property>;

    fn get(&self, property: Self::Property) -> Self::Value;

    fn set(&mut self, value: Self::Value);
}

// ───────────────────────── Accounts ─────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountProperty {
    Balance,
    Expiry,
    IsDeleted,
    IsSmartContract,
    AutoRenewPeriod,
    Tokens,
    Proxy,
    Memo,
    Alias,
    IsReceiverSigRequired,
    MaxAutoAssociations,
    UsedAutoAssociations,
    NumNftsOwned,
}

const ACCOUNT_PROPERTIES: [AccountProperty; 13] = [
    AccountProperty::Balance,
    AccountProperty::Expiry,
    AccountProperty::IsDeleted,
    AccountProperty::IsSmartContract,
    AccountProperty::AutoRenewPeriod,
    AccountProperty::Tokens,
    AccountProperty::Proxy,
    AccountProperty::Memo,
    AccountProperty::Alias,
    AccountProperty::IsReceiverSigRequired,
    AccountProperty::MaxAutoAssociations,
    AccountProperty::UsedAutoAssociations,
    AccountProperty::NumNftsOwned,
];

impl LedgerProperty for AccountProperty {
    fn all() -> &'static [Self] {
        &ACCOUNT_PROPERTIES
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValue {
    Balance(i64),
    Expiry(i64),
    IsDeleted(bool),
    IsSmartContract(bool),
    AutoRenewPeriod(i64),
    Tokens(Vec<TokenId>),
    Proxy(Option<AccountId>),
    Memo(String),
    Alias(Vec<u8>),
    IsReceiverSigRequired(bool),
    MaxAutoAssociations(i32),
    UsedAutoAssociations(i32),
    NumNftsOwned(i64),
}

impl AccountValue {
    pub fn as_long(&self) -> Option<i64> {
        match self {
            AccountValue::Balance(v)
            | AccountValue::Expiry(v)
            | AccountValue::AutoRenewPeriod(v)
            | AccountValue::NumNftsOwned(v) => Some(*v),
            AccountValue::MaxAutoAssociations(v) | AccountValue::UsedAutoAssociations(v) => {
                Some(i64::from(*v))
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AccountValue::IsDeleted(v)
            | AccountValue::IsSmartContract(v)
            | AccountValue::IsReceiverSigRequired(v) => Some(*v),
            _ => None,
        }
    }
}

impl PropertyValue for AccountValue {
    type Property = AccountProperty;

    fn property(&self) -> AccountProperty {
        match self {
            AccountValue::Balance(_) => AccountProperty::Balance,
            AccountValue::Expiry(_) => AccountProperty::Expiry,
            AccountValue::IsDeleted(_) => AccountProperty::IsDeleted,
            AccountValue::IsSmartContract(_) => AccountProperty::IsSmartContract,
            AccountValue::AutoRenewPeriod(_) => AccountProperty::AutoRenewPeriod,
            AccountValue::Tokens(_) => AccountProperty::Tokens,
            AccountValue::Proxy(_) => AccountProperty::Proxy,
            AccountValue::Memo(_) => AccountProperty::Memo,
            AccountValue::Alias(_) => AccountProperty::Alias,
            AccountValue::IsReceiverSigRequired(_) => AccountProperty::IsReceiverSigRequired,
            AccountValue::MaxAutoAssociations(_) => AccountProperty::MaxAutoAssociations,
            AccountValue::UsedAutoAssociations(_) => AccountProperty::UsedAutoAssociations,
            AccountValue::NumNftsOwned(_) => AccountProperty::NumNftsOwned,
        }
    }
}

impl LedgerEntity for Account {
    type Property = AccountProperty;
    type Value = AccountValue;

    fn get(&self, property: AccountProperty) -> AccountValue {
        match property {
            AccountProperty::Balance => AccountValue::Balance(self.balance),
            AccountProperty::Expiry => AccountValue::Expiry(self.expiry),
            AccountProperty::IsDeleted => AccountValue::IsDeleted(self.deleted),
            AccountProperty::IsSmartContract => AccountValue::IsSmartContract(self.smart_contract),
            AccountProperty::AutoRenewPeriod => AccountValue::AutoRenewPeriod(self.auto_renew_period),
            AccountProperty::Tokens => AccountValue::Tokens(self.tokens.clone()),
            AccountProperty::Proxy => AccountValue::Proxy(self.proxy),
            AccountProperty::Memo => AccountValue::Memo(self.memo.clone()),
            AccountProperty::Alias => AccountValue::Alias(self.alias.clone()),
            AccountProperty::IsReceiverSigRequired => {
                AccountValue::IsReceiverSigRequired(self.receiver_sig_required)
            }
            AccountProperty::MaxAutoAssociations => {
                AccountValue::MaxAutoAssociations(self.max_auto_associations)
            }
            AccountProperty::UsedAutoAssociations => {
                AccountValue::UsedAutoAssociations(self.used_auto_associations)
            }
            AccountProperty::NumNftsOwned => AccountValue::NumNftsOwned(self.num_nfts_owned),
        }
    }

    fn set(&mut self, value: AccountValue) {
        match value {
            AccountValue::Balance(v) => self.balance = v,
            AccountValue::Expiry(v) => self.expiry = v,
            AccountValue::IsDeleted(v) => self.deleted = v,
            AccountValue::IsSmartContract(v) => self.smart_contract = v,
            AccountValue::AutoRenewPeriod(v) => self.auto_renew_period = v,
            AccountValue::Tokens(v) => self.tokens = v,
            AccountValue::Proxy(v) => self.proxy = v,
            AccountValue::Memo(v) => self.memo = v,
            AccountValue::Alias(v) => self.alias = v,
            AccountValue::IsReceiverSigRequired(v) => self.receiver_sig_required = v,
            AccountValue::MaxAutoAssociations(v) => self.max_auto_associations = v,
            AccountValue::UsedAutoAssociations(v) => self.used_auto_associations = v,
            AccountValue::NumNftsOwned(v) => self.num_nfts_owned = v,
        }
    }
}

// ───────────────────────── Token relationships ─────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenRelProperty {
    TokenBalance,
    IsFrozen,
    IsKycGranted,
    IsAutomaticAssociation,
}

const TOKEN_REL_PROPERTIES: [TokenRelProperty; 4] = [
    TokenRelProperty::TokenBalance,
    TokenRelProperty::IsFrozen,
    TokenRelProperty::IsKycGranted,
    TokenRelProperty::IsAutomaticAssociation,
];

impl LedgerProperty for TokenRelProperty {
    fn all() -> &'static [Self] {
        &TOKEN_REL_PROPERTIES
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRelValue {
    TokenBalance(i64),
    IsFrozen(bool),
    IsKycGranted(bool),
    IsAutomaticAssociation(bool),
}

impl TokenRelValue {
    pub fn as_long(&self) -> Option<i64> {
        match self {
            TokenRelValue::TokenBalance(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TokenRelValue::IsFrozen(v)
            | TokenRelValue::IsKycGranted(v)
            | TokenRelValue::IsAutomaticAssociation(v) => Some(*v),
            TokenRelValue::TokenBalance(_) => None,
        }
    }
}

impl PropertyValue for TokenRelValue {
    type Property = TokenRelProperty;

    fn property(&self) -> TokenRelProperty {
        match self {
            TokenRelValue::TokenBalance(_) => TokenRelProperty::TokenBalance,
            TokenRelValue::IsFrozen(_) => TokenRelProperty::IsFrozen,
            TokenRelValue::IsKycGranted(_) => TokenRelProperty::IsKycGranted,
            TokenRelValue::IsAutomaticAssociation(_) => TokenRelProperty::IsAutomaticAssociation,
        }
    }
}

impl LedgerEntity for TokenRelationship {
    type Property = TokenRelProperty;
    type Value = TokenRelValue;

    fn get(&self, property: TokenRelProperty) -> TokenRelValue {
        match property {
            TokenRelProperty::TokenBalance => TokenRelValue::TokenBalance(self.balance),
            TokenRelProperty::IsFrozen => TokenRelValue::IsFrozen(self.frozen),
            TokenRelProperty::IsKycGranted => TokenRelValue::IsKycGranted(self.kyc_granted),
            TokenRelProperty::IsAutomaticAssociation => {
                TokenRelValue::IsAutomaticAssociation(self.automatic_association)
            }
        }
    }

    fn set(&mut self, value: TokenRelValue) {
        match value {
            TokenRelValue::TokenBalance(v) => self.balance = v,
            TokenRelValue::IsFrozen(v) => self.frozen = v,
            TokenRelValue::IsKycGranted(v) => self.kyc_granted = v,
            TokenRelValue::IsAutomaticAssociation(v) => self.automatic_association = v,
        }
    }
}

// ───────────────────────── Unique tokens ─────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NftProperty {
    Owner,
    Metadata,
}

const NFT_PROPERTIES: [NftProperty; 2] = [NftProperty::Owner, NftProperty::Metadata];

impl LedgerProperty for NftProperty {
    fn all() -> &'static [Self] {
        &NFT_PROPERTIES
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NftValue {
    Owner(AccountId),
    Metadata(Vec<u8>),
}

impl PropertyValue for NftValue {
    type Property = NftProperty;

    fn property(&self) -> NftProperty {
        match self {
            NftValue::Owner(_) => NftProperty::Owner,
            NftValue::Metadata(_) => NftProperty::Metadata,
        }
    }
}

impl LedgerEntity for UniqueToken {
    type Property = NftProperty;
    type Value = NftValue;

    fn get(&self, property: NftProperty) -> NftValue {
        match property {
            NftProperty::Owner => NftValue::Owner(self.owner),
            NftProperty::Metadata => NftValue::Metadata(self.metadata.clone()),
        }
    }

    fn set(&mut self, value: NftValue) {
        match value {
            NftValue::Owner(v) => self.owner = v,
            NftValue::Metadata(v) => self.metadata = v,
        }
    }
}
