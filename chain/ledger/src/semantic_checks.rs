//! Pure transfer-list validation
//!
//! Checks that need no ledger state: allowance support, repeated accounts,
//! zero-sum HBAR adjustments, list sizes and the shape of each token list.
//! Codes are reported in a fixed priority so the same malformed transaction
//! always resolves to the same response.

use std::collections::HashSet;

use types::ids::{AccountId, TokenId};
use types::response::ResponseCode;
use types::transfer::{AccountAmount, NftTransfer, TokenTransferList, TransferList};

use crate::config::ValidationProps;

#[derive(Debug, Clone, Copy, Default)]
pub struct PureTransferSemanticChecks;

impl PureTransferSemanticChecks {
    pub fn new() -> Self {
        Self
    }

    pub fn full_pure_validation(
        &self,
        hbar_adjusts: &TransferList,
        token_adjusts: &[TokenTransferList],
        props: &ValidationProps,
    ) -> ResponseCode {
        if !props.allowances_enabled && self.uses_allowances(hbar_adjusts, token_adjusts) {
            return ResponseCode::NotSupported;
        }

        let amounts = &hbar_adjusts.account_amounts;
        if self.has_repeated_account(amounts) {
            return ResponseCode::AccountRepeatedInAccountAmounts;
        }
        if !self.is_net_zero_adjustment(amounts) {
            return ResponseCode::InvalidAccountAmounts;
        }
        if !self.is_acceptable_size(amounts, props.max_hbar_adjusts) {
            return ResponseCode::TransferListSizeLimitExceeded;
        }

        let validity = self.validate_token_transfer_syntax(
            token_adjusts,
            props.max_token_adjusts,
            props.max_ownership_changes,
            props.nfts_enabled,
        );
        if validity != ResponseCode::Ok {
            return validity;
        }
        self.validate_token_transfer_semantics(token_adjusts)
    }

    /// Syntax and semantics of the token lists alone.
    pub fn validate_token_transfers(
        &self,
        token_adjusts: &[TokenTransferList],
        props: &ValidationProps,
    ) -> ResponseCode {
        let validity = self.validate_token_transfer_syntax(
            token_adjusts,
            props.max_token_adjusts,
            props.max_ownership_changes,
            props.nfts_enabled,
        );
        if validity != ResponseCode::Ok {
            return validity;
        }
        self.validate_token_transfer_semantics(token_adjusts)
    }

    fn uses_allowances(&self, hbar_adjusts: &TransferList, token_adjusts: &[TokenTransferList]) -> bool {
        self.has_allowance_transfers(&hbar_adjusts.account_amounts)
            || token_adjusts.iter().any(|list| {
                self.has_allowance_transfers(&list.transfers)
                    || self.has_allowance_nft_transfers(&list.nft_transfers)
            })
    }

    pub fn has_allowance_transfers(&self, amounts: &[AccountAmount]) -> bool {
        amounts.iter().any(|aa| aa.is_approval)
    }

    pub fn has_allowance_nft_transfers(&self, nft_transfers: &[NftTransfer]) -> bool {
        nft_transfers.iter().any(|xfer| xfer.is_approval)
    }

    /// An account may appear once as owner and once as approved spender.
    pub fn has_repeated_account(&self, amounts: &[AccountAmount]) -> bool {
        let mut seen: HashSet<(AccountId, bool)> = HashSet::with_capacity(amounts.len());
        amounts
            .iter()
            .any(|aa| !seen.insert((aa.account, aa.is_approval)))
    }

    pub fn is_net_zero_adjustment(&self, amounts: &[AccountAmount]) -> bool {
        let mut net = 0i64;
        for aa in amounts {
            match net.checked_add(aa.amount) {
                Some(sum) => net = sum,
                None => return false,
            }
        }
        net == 0
    }

    pub fn is_acceptable_size(&self, amounts: &[AccountAmount], max_list_len: usize) -> bool {
        amounts.len() <= max_list_len
    }

    pub fn validate_token_transfer_syntax(
        &self,
        token_adjusts: &[TokenTransferList],
        max_list_len: usize,
        max_ownership_changes: usize,
        nfts_enabled: bool,
    ) -> ResponseCode {
        if token_adjusts.is_empty() {
            return ResponseCode::Ok;
        }
        if token_adjusts.len() > max_list_len {
            return ResponseCode::TokenTransferListSizeLimitExceeded;
        }

        let mut count = 0usize;
        let mut ownership_changes = 0usize;
        for list in token_adjusts {
            let fungible_here = list.transfers.len();
            let ownership_here = list.nft_transfers.len();
            if fungible_here == 0 && ownership_here == 0 {
                return ResponseCode::EmptyTokenTransferAccountAmounts;
            }
            if ownership_here > 0 {
                if fungible_here > 0 {
                    return ResponseCode::InvalidAccountAmounts;
                }
                if !nfts_enabled {
                    return ResponseCode::NotSupported;
                }
                ownership_changes += ownership_here;
                if ownership_changes > max_ownership_changes {
                    return ResponseCode::BatchSizeLimitExceeded;
                }
            } else {
                count += fungible_here;
                if count > max_list_len {
                    return ResponseCode::TokenTransferListSizeLimitExceeded;
                }
            }
        }
        ResponseCode::Ok
    }

    pub fn validate_token_transfer_semantics(&self, token_adjusts: &[TokenTransferList]) -> ResponseCode {
        let mut tokens: HashSet<TokenId> = HashSet::with_capacity(token_adjusts.len());
        for list in token_adjusts {
            if !list.token.is_set() {
                return ResponseCode::InvalidTokenId;
            }
            if !tokens.insert(list.token) {
                return ResponseCode::TokenIdRepeatedInTokenList;
            }
            let validity = if list.nft_transfers.is_empty() {
                self.validate_fungible_semantics(&list.transfers)
            } else {
                self.validate_ownership_semantics(&list.nft_transfers)
            };
            if validity != ResponseCode::Ok {
                return validity;
            }
        }
        ResponseCode::Ok
    }

    fn validate_fungible_semantics(&self, transfers: &[AccountAmount]) -> ResponseCode {
        if transfers.iter().any(|aa| !aa.account.is_set()) {
            return ResponseCode::InvalidAccountId;
        }
        if self.has_repeated_account(transfers) {
            return ResponseCode::AccountRepeatedInAccountAmounts;
        }
        if !self.is_net_zero_adjustment(transfers) {
            return ResponseCode::TransfersNotZeroSumForToken;
        }
        ResponseCode::Ok
    }

    fn validate_ownership_semantics(&self, nft_transfers: &[NftTransfer]) -> ResponseCode {
        let mut serials: HashSet<i64> = HashSet::with_capacity(nft_transfers.len());
        for xfer in nft_transfers {
            if !xfer.sender.is_set() || !xfer.receiver.is_set() {
                return ResponseCode::InvalidAccountId;
            }
            if xfer.sender == xfer.receiver {
                return ResponseCode::AccountRepeatedInAccountAmounts;
            }
            if !serials.insert(xfer.serial) {
                return ResponseCode::InvalidAccountAmounts;
            }
        }
        ResponseCode::Ok
    }
}
