//! Token business rules
//!
//! The token store owns token definitions and decides whether a token leg may
//! proceed: token existence, deletion and pause state, account association,
//! freeze and KYC status, token balance sufficiency and NFT ownership. Balance
//! state itself lives in the token-relationship and NFT ledgers, which the
//! caller lends to the store for the duration of one call.

use std::collections::HashMap;

use tracing::debug;
use types::account::{Account, Token, TokenRelationship, UniqueToken};
use types::ids::{AccountId, NftId, TokenId, TokenRelKey};
use types::response::ResponseCode;

use crate::balance_change::BalanceChange;
use crate::errors::LedgerError;
use crate::properties::{AccountProperty, AccountValue, NftProperty, NftValue, TokenRelProperty, TokenRelValue};
use crate::transactional::TransactionalLedger;

/// Ledgers a token operation may touch
pub struct TokenLedgers<'a> {
    pub accounts: &'a mut TransactionalLedger<AccountId, Account>,
    pub rels: &'a mut TransactionalLedger<TokenRelKey, TokenRelationship>,
    pub nfts: Option<&'a mut TransactionalLedger<NftId, UniqueToken>>,
}

/// Business-rule gate for token legs.
///
/// Business outcomes come back as a `ResponseCode`; `Err` means a ledger was
/// driven out of protocol.
pub trait TokenStore {
    /// Validate and stage one token leg.
    fn try_token_change(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        change: &BalanceChange,
    ) -> Result<ResponseCode, LedgerError>;

    fn adjust_balance(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
        adjustment: i64,
    ) -> Result<ResponseCode, LedgerError>;

    fn grant_kyc(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError>;

    fn revoke_kyc(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError>;

    fn freeze(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError>;

    fn unfreeze(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError>;

    fn is_known_treasury(&self, account: &AccountId) -> bool;
}

/// Token store over an in-memory table of token definitions
#[derive(Debug, Clone, Default)]
pub struct HederaTokenStore {
    tokens: HashMap<TokenId, Token>,
}

/// Short-circuits a rule chain on the first non-OK code.
macro_rules! check {
    ($expr:expr) => {
        match $expr {
            Ok(()) => {}
            Err(code) => return Ok(code),
        }
    };
}

impl HederaTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, id: TokenId, token: Token) -> Self {
        self.tokens.insert(id, token);
        self
    }

    pub fn add_token(&mut self, id: TokenId, token: Token) {
        self.tokens.insert(id, token);
    }

    pub fn get(&self, id: &TokenId) -> Option<&Token> {
        self.tokens.get(id)
    }

    pub fn get_mut(&mut self, id: &TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(id)
    }

    /// The token, if it exists and is neither deleted nor paused.
    fn usable_token(&self, id: &TokenId) -> Result<Token, ResponseCode> {
        let token = self.tokens.get(id).ok_or(ResponseCode::InvalidTokenId)?;
        if token.deleted {
            return Err(ResponseCode::TokenWasDeleted);
        }
        if token.paused {
            return Err(ResponseCode::TokenIsPaused);
        }
        Ok(token.clone())
    }

    fn usable_account(
        ledgers: &TokenLedgers<'_>,
        account: &AccountId,
    ) -> Result<Result<(), ResponseCode>, LedgerError> {
        if !ledgers.accounts.exists(account) {
            return Ok(Err(ResponseCode::InvalidAccountId));
        }
        let deleted = ledgers
            .accounts
            .get(account, AccountProperty::IsDeleted)?
            .as_bool()
            .unwrap_or(false);
        if deleted {
            return Ok(Err(ResponseCode::AccountDeleted));
        }
        Ok(Ok(()))
    }

    /// Association, freeze and KYC gate for `account` moving `token`.
    ///
    /// A credit to an unassociated account with a free automatic-association
    /// slot associates it on the spot.
    fn transferable_relationship(
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token_id: TokenId,
        token: &Token,
        is_credit: bool,
    ) -> Result<Result<(), ResponseCode>, LedgerError> {
        let key = TokenRelKey::new(account, token_id);
        if !ledgers.rels.exists(&key) {
            if !is_credit || !Self::has_free_auto_association(ledgers, &account)? {
                return Ok(Err(ResponseCode::TokenNotAssociatedToAccount));
            }
            Self::auto_associate(ledgers, account, token_id, token)?;
        }
        let frozen = ledgers
            .rels
            .get(&key, TokenRelProperty::IsFrozen)?
            .as_bool()
            .unwrap_or(false);
        if frozen {
            return Ok(Err(ResponseCode::AccountFrozenForToken));
        }
        let kyc_granted = ledgers
            .rels
            .get(&key, TokenRelProperty::IsKycGranted)?
            .as_bool()
            .unwrap_or(false);
        if token.has_kyc_key && !kyc_granted {
            return Ok(Err(ResponseCode::AccountKycNotGrantedForToken));
        }
        Ok(Ok(()))
    }

    fn has_free_auto_association(
        ledgers: &TokenLedgers<'_>,
        account: &AccountId,
    ) -> Result<bool, LedgerError> {
        let max = ledgers
            .accounts
            .get(account, AccountProperty::MaxAutoAssociations)?
            .as_long()
            .unwrap_or(0);
        let used = ledgers
            .accounts
            .get(account, AccountProperty::UsedAutoAssociations)?
            .as_long()
            .unwrap_or(0);
        Ok(used < max)
    }

    fn auto_associate(
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token_id: TokenId,
        token: &Token,
    ) -> Result<(), LedgerError> {
        let key = TokenRelKey::new(account, token_id);
        ledgers.rels.create(key)?;
        ledgers
            .rels
            .set(&key, TokenRelValue::IsFrozen(token.has_freeze_key && token.freeze_default))?;
        ledgers
            .rels
            .set(&key, TokenRelValue::IsKycGranted(!token.has_kyc_key))?;
        ledgers.rels.set(&key, TokenRelValue::IsAutomaticAssociation(true))?;

        let mut tokens = match ledgers.accounts.get(&account, AccountProperty::Tokens)? {
            AccountValue::Tokens(tokens) => tokens,
            _ => Vec::new(),
        };
        tokens.push(token_id);
        ledgers.accounts.set(&account, AccountValue::Tokens(tokens))?;

        let used = match ledgers.accounts.get(&account, AccountProperty::UsedAutoAssociations)? {
            AccountValue::UsedAutoAssociations(used) => used,
            _ => 0,
        };
        ledgers
            .accounts
            .set(&account, AccountValue::UsedAutoAssociations(used + 1))?;
        debug!(account = %account, token = %token_id, "Automatically associated token");
        Ok(())
    }

    fn rel_balance(ledgers: &TokenLedgers<'_>, key: &TokenRelKey) -> Result<i64, LedgerError> {
        Ok(ledgers
            .rels
            .get(key, TokenRelProperty::TokenBalance)?
            .as_long()
            .unwrap_or(0))
    }

    fn adjust_nfts_owned(
        ledgers: &mut TokenLedgers<'_>,
        account: &AccountId,
        delta: i64,
    ) -> Result<(), LedgerError> {
        let owned = ledgers
            .accounts
            .get(account, AccountProperty::NumNftsOwned)?
            .as_long()
            .unwrap_or(0);
        ledgers
            .accounts
            .set(account, AccountValue::NumNftsOwned(owned + delta))
    }

    fn change_owner(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        nft_id: NftId,
        from: AccountId,
        to: AccountId,
    ) -> Result<ResponseCode, LedgerError> {
        let token = match self.usable_token(&nft_id.token) {
            Ok(token) => token,
            Err(code) => return Ok(code),
        };
        check!(Self::usable_account(ledgers, &from)?);
        check!(Self::usable_account(ledgers, &to)?);

        let owner = {
            let nfts = ledgers
                .nfts
                .as_deref()
                .ok_or(LedgerError::TokenLedgersUnavailable)?;
            if !nfts.exists(&nft_id) {
                return Ok(ResponseCode::InvalidNftId);
            }
            nfts.get(&nft_id, NftProperty::Owner)?
        };
        if owner != NftValue::Owner(from) {
            return Ok(ResponseCode::SenderDoesNotOwnNftSerialNo);
        }

        check!(Self::transferable_relationship(ledgers, from, nft_id.token, &token, false)?);
        check!(Self::transferable_relationship(ledgers, to, nft_id.token, &token, true)?);

        let from_key = TokenRelKey::new(from, nft_id.token);
        let to_key = TokenRelKey::new(to, nft_id.token);
        let from_balance = Self::rel_balance(ledgers, &from_key)?;
        if from_balance < 1 {
            return Ok(ResponseCode::InsufficientTokenBalance);
        }
        let to_balance = Self::rel_balance(ledgers, &to_key)?;

        ledgers
            .rels
            .set(&from_key, TokenRelValue::TokenBalance(from_balance - 1))?;
        ledgers
            .rels
            .set(&to_key, TokenRelValue::TokenBalance(to_balance + 1))?;
        if let Some(nfts) = ledgers.nfts.as_deref_mut() {
            nfts.set(&nft_id, NftValue::Owner(to))?;
        }
        Self::adjust_nfts_owned(ledgers, &from, -1)?;
        Self::adjust_nfts_owned(ledgers, &to, 1)?;
        Ok(ResponseCode::Ok)
    }

    fn set_rel_flag(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token_id: TokenId,
        value: TokenRelValue,
    ) -> Result<ResponseCode, LedgerError> {
        let token = match self.tokens.get(&token_id) {
            Some(token) => token,
            None => return Ok(ResponseCode::InvalidTokenId),
        };
        if token.deleted {
            return Ok(ResponseCode::TokenWasDeleted);
        }
        match value {
            TokenRelValue::IsFrozen(_) if !token.has_freeze_key => {
                return Ok(ResponseCode::TokenHasNoFreezeKey)
            }
            TokenRelValue::IsKycGranted(_) if !token.has_kyc_key => {
                return Ok(ResponseCode::TokenHasNoKycKey)
            }
            _ => {}
        }
        check!(Self::usable_account(ledgers, &account)?);

        let key = TokenRelKey::new(account, token_id);
        if !ledgers.rels.exists(&key) {
            return Ok(ResponseCode::TokenNotAssociatedToAccount);
        }
        ledgers.rels.set(&key, value)?;
        Ok(ResponseCode::Ok)
    }
}

impl TokenStore for HederaTokenStore {
    fn try_token_change(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        change: &BalanceChange,
    ) -> Result<ResponseCode, LedgerError> {
        let Some(token) = change.token() else {
            return Ok(ResponseCode::InvalidTokenId);
        };
        match (change.nft_id(), change.counterparty()) {
            (Some(nft_id), Some(receiver)) => {
                self.change_owner(ledgers, nft_id, change.account(), receiver)
            }
            _ => self.adjust_balance(ledgers, change.account(), token, change.units()),
        }
    }

    fn adjust_balance(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token_id: TokenId,
        adjustment: i64,
    ) -> Result<ResponseCode, LedgerError> {
        let token = match self.usable_token(&token_id) {
            Ok(token) => token,
            Err(code) => return Ok(code),
        };
        check!(Self::usable_account(ledgers, &account)?);
        check!(Self::transferable_relationship(
            ledgers,
            account,
            token_id,
            &token,
            adjustment > 0
        )?);

        let key = TokenRelKey::new(account, token_id);
        let balance = Self::rel_balance(ledgers, &key)?;
        let new_balance = match balance.checked_add(adjustment) {
            Some(new_balance) => new_balance,
            None => return Ok(ResponseCode::InvalidAccountAmounts),
        };
        if new_balance < 0 {
            return Ok(ResponseCode::InsufficientTokenBalance);
        }
        ledgers.rels.set(&key, TokenRelValue::TokenBalance(new_balance))?;
        Ok(ResponseCode::Ok)
    }

    fn grant_kyc(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError> {
        self.set_rel_flag(ledgers, account, token, TokenRelValue::IsKycGranted(true))
    }

    fn revoke_kyc(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError> {
        self.set_rel_flag(ledgers, account, token, TokenRelValue::IsKycGranted(false))
    }

    fn freeze(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError> {
        self.set_rel_flag(ledgers, account, token, TokenRelValue::IsFrozen(true))
    }

    fn unfreeze(
        &mut self,
        ledgers: &mut TokenLedgers<'_>,
        account: AccountId,
        token: TokenId,
    ) -> Result<ResponseCode, LedgerError> {
        self.set_rel_flag(ledgers, account, token, TokenRelValue::IsFrozen(false))
    }

    fn is_known_treasury(&self, account: &AccountId) -> bool {
        self.tokens
            .values()
            .any(|token| !token.deleted && token.treasury == *account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::InMemoryBackingStore;

    const TOKEN: TokenId = TokenId::from_num(5000);
    const NFT_TOKEN: TokenId = TokenId::from_num(6000);
    const ALICE: AccountId = AccountId::from_num(1001);
    const BOB: AccountId = AccountId::from_num(1002);

    struct Fixture {
        accounts: TransactionalLedger<AccountId, Account>,
        rels: TransactionalLedger<TokenRelKey, TokenRelationship>,
        nfts: TransactionalLedger<NftId, UniqueToken>,
    }

    impl Fixture {
        fn new() -> Self {
            let accounts = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![
                (ALICE, Account::with_balance(100)),
                (BOB, Account::with_balance(100)),
            ])));
            let rels = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![
                (
                    TokenRelKey::new(ALICE, TOKEN),
                    TokenRelationship {
                        balance: 50,
                        ..TokenRelationship::default()
                    },
                ),
                (TokenRelKey::new(BOB, TOKEN), TokenRelationship::default()),
                (
                    TokenRelKey::new(ALICE, NFT_TOKEN),
                    TokenRelationship {
                        balance: 1,
                        ..TokenRelationship::default()
                    },
                ),
            ])));
            let nfts = TransactionalLedger::new(Box::new(InMemoryBackingStore::with_entities(vec![(
                NftId::new(NFT_TOKEN, 1),
                UniqueToken {
                    owner: ALICE,
                    metadata: vec![],
                },
            )])));
            let mut fixture = Self { accounts, rels, nfts };
            fixture.accounts.begin().unwrap();
            fixture.rels.begin().unwrap();
            fixture.nfts.begin().unwrap();
            fixture
        }

        fn ledgers(&mut self) -> TokenLedgers<'_> {
            TokenLedgers {
                accounts: &mut self.accounts,
                rels: &mut self.rels,
                nfts: Some(&mut self.nfts),
            }
        }

        fn token_balance(&self, account: AccountId, token: TokenId) -> i64 {
            self.rels
                .get(&TokenRelKey::new(account, token), TokenRelProperty::TokenBalance)
                .unwrap()
                .as_long()
                .unwrap()
        }
    }

    fn store() -> HederaTokenStore {
        HederaTokenStore::new()
            .with_token(TOKEN, Token::fungible(ALICE))
            .with_token(NFT_TOKEN, Token::non_fungible(ALICE))
    }

    #[test]
    fn test_adjust_balance_debits_and_credits() {
        let mut fixture = Fixture::new();
        let mut store = store();
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -20).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), BOB, TOKEN, 20).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(fixture.token_balance(ALICE, TOKEN), 30);
        assert_eq!(fixture.token_balance(BOB, TOKEN), 20);
    }

    #[test]
    fn test_insufficient_token_balance() {
        let mut fixture = Fixture::new();
        let mut store = store();
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -51).unwrap(),
            ResponseCode::InsufficientTokenBalance
        );
        assert_eq!(fixture.token_balance(ALICE, TOKEN), 50);
    }

    #[test]
    fn test_token_state_rules() {
        let mut fixture = Fixture::new();
        let mut store = store();
        assert_eq!(
            store
                .adjust_balance(&mut fixture.ledgers(), ALICE, TokenId::from_num(1), 1)
                .unwrap(),
            ResponseCode::InvalidTokenId
        );

        store.get_mut(&TOKEN).unwrap().paused = true;
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -1).unwrap(),
            ResponseCode::TokenIsPaused
        );

        store.get_mut(&TOKEN).unwrap().deleted = true;
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -1).unwrap(),
            ResponseCode::TokenWasDeleted
        );
    }

    #[test]
    fn test_unassociated_account_rejected_without_free_slot() {
        let mut fixture = Fixture::new();
        let mut store = store().with_token(TokenId::from_num(7000), Token::fungible(ALICE));
        assert_eq!(
            store
                .adjust_balance(&mut fixture.ledgers(), BOB, TokenId::from_num(7000), 5)
                .unwrap(),
            ResponseCode::TokenNotAssociatedToAccount
        );
    }

    #[test]
    fn test_credit_auto_associates_with_free_slot() {
        let mut fixture = Fixture::new();
        let other = TokenId::from_num(7000);
        let mut store = store().with_token(other, Token::fungible(ALICE));
        fixture
            .accounts
            .set(&BOB, AccountValue::MaxAutoAssociations(1))
            .unwrap();

        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), BOB, other, 5).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(fixture.token_balance(BOB, other), 5);
        assert_eq!(
            fixture.accounts.get(&BOB, AccountProperty::UsedAutoAssociations).unwrap(),
            AccountValue::UsedAutoAssociations(1)
        );
        assert_eq!(
            fixture.accounts.get(&BOB, AccountProperty::Tokens).unwrap(),
            AccountValue::Tokens(vec![other])
        );
    }

    #[test]
    fn test_debit_never_auto_associates() {
        let mut fixture = Fixture::new();
        let other = TokenId::from_num(7000);
        let mut store = store().with_token(other, Token::fungible(ALICE));
        fixture
            .accounts
            .set(&BOB, AccountValue::MaxAutoAssociations(1))
            .unwrap();
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), BOB, other, -5).unwrap(),
            ResponseCode::TokenNotAssociatedToAccount
        );
    }

    #[test]
    fn test_freeze_and_kyc() {
        let mut fixture = Fixture::new();
        let mut store = HederaTokenStore::new().with_token(
            TOKEN,
            Token {
                has_freeze_key: true,
                has_kyc_key: true,
                ..Token::fungible(ALICE)
            },
        );

        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -1).unwrap(),
            ResponseCode::AccountKycNotGrantedForToken
        );
        assert_eq!(
            store.grant_kyc(&mut fixture.ledgers(), ALICE, TOKEN).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            store.freeze(&mut fixture.ledgers(), ALICE, TOKEN).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -1).unwrap(),
            ResponseCode::AccountFrozenForToken
        );
        assert_eq!(
            store.unfreeze(&mut fixture.ledgers(), ALICE, TOKEN).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -1).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            store.revoke_kyc(&mut fixture.ledgers(), ALICE, TOKEN).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            store.adjust_balance(&mut fixture.ledgers(), ALICE, TOKEN, -1).unwrap(),
            ResponseCode::AccountKycNotGrantedForToken
        );
    }

    #[test]
    fn test_flags_require_keys() {
        let mut fixture = Fixture::new();
        let mut store = store();
        assert_eq!(
            store.freeze(&mut fixture.ledgers(), ALICE, TOKEN).unwrap(),
            ResponseCode::TokenHasNoFreezeKey
        );
        assert_eq!(
            store.grant_kyc(&mut fixture.ledgers(), ALICE, TOKEN).unwrap(),
            ResponseCode::TokenHasNoKycKey
        );
    }

    #[test]
    fn test_nft_ownership_change() {
        let mut fixture = Fixture::new();
        let mut store = store();
        fixture
            .rels
            .create(TokenRelKey::new(BOB, NFT_TOKEN))
            .unwrap();
        let change = BalanceChange::nft_ownership_change(NFT_TOKEN, ALICE, BOB, 1);

        assert_eq!(
            store.try_token_change(&mut fixture.ledgers(), &change).unwrap(),
            ResponseCode::Ok
        );
        assert_eq!(
            fixture.nfts.get(&NftId::new(NFT_TOKEN, 1), NftProperty::Owner).unwrap(),
            NftValue::Owner(BOB)
        );
        assert_eq!(fixture.token_balance(ALICE, NFT_TOKEN), 0);
        assert_eq!(fixture.token_balance(BOB, NFT_TOKEN), 1);
        assert_eq!(
            fixture.accounts.get(&BOB, AccountProperty::NumNftsOwned).unwrap(),
            AccountValue::NumNftsOwned(1)
        );
    }

    #[test]
    fn test_nft_sender_must_own_serial() {
        let mut fixture = Fixture::new();
        let mut store = store();
        let change = BalanceChange::nft_ownership_change(NFT_TOKEN, BOB, ALICE, 1);
        assert_eq!(
            store.try_token_change(&mut fixture.ledgers(), &change).unwrap(),
            ResponseCode::SenderDoesNotOwnNftSerialNo
        );

        let missing = BalanceChange::nft_ownership_change(NFT_TOKEN, ALICE, BOB, 99);
        assert_eq!(
            store.try_token_change(&mut fixture.ledgers(), &missing).unwrap(),
            ResponseCode::InvalidNftId
        );
    }

    #[test]
    fn test_known_treasury() {
        let store = store();
        assert!(store.is_known_treasury(&ALICE));
        assert!(!store.is_known_treasury(&BOB));
    }
}
