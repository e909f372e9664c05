//! Stable response codes
//!
//! Every business-rule outcome of a ledger operation maps to exactly one of
//! these codes; they are what a failed transaction reports to its submitter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a validation or ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Ok,
    FailInvalid,
    NotSupported,
    InvalidAccountId,
    InvalidAccountAmounts,
    InsufficientAccountBalance,
    InsufficientPayerBalance,
    AccountDeleted,
    AccountExpiredAndPendingRemoval,
    AccountRepeatedInAccountAmounts,
    TransferListSizeLimitExceeded,
    InvalidTokenId,
    TokenWasDeleted,
    TokenIsPaused,
    TokenIdRepeatedInTokenList,
    TokenNotAssociatedToAccount,
    TokenHasNoFreezeKey,
    TokenHasNoKycKey,
    AccountFrozenForToken,
    AccountKycNotGrantedForToken,
    InsufficientTokenBalance,
    EmptyTokenTransferAccountAmounts,
    TokenTransferListSizeLimitExceeded,
    TransfersNotZeroSumForToken,
    BatchSizeLimitExceeded,
    InvalidNftId,
    SenderDoesNotOwnNftSerialNo,
    NoRemainingAutomaticAssociations,
}

impl ResponseCode {
    /// Canonical wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::FailInvalid => "FAIL_INVALID",
            ResponseCode::NotSupported => "NOT_SUPPORTED",
            ResponseCode::InvalidAccountId => "INVALID_ACCOUNT_ID",
            ResponseCode::InvalidAccountAmounts => "INVALID_ACCOUNT_AMOUNTS",
            ResponseCode::InsufficientAccountBalance => "INSUFFICIENT_ACCOUNT_BALANCE",
            ResponseCode::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            ResponseCode::AccountDeleted => "ACCOUNT_DELETED",
            ResponseCode::AccountExpiredAndPendingRemoval => "ACCOUNT_EXPIRED_AND_PENDING_REMOVAL",
            ResponseCode::AccountRepeatedInAccountAmounts => "ACCOUNT_REPEATED_IN_ACCOUNT_AMOUNTS",
            ResponseCode::TransferListSizeLimitExceeded => "TRANSFER_LIST_SIZE_LIMIT_EXCEEDED",
            ResponseCode::InvalidTokenId => "INVALID_TOKEN_ID",
            ResponseCode::TokenWasDeleted => "TOKEN_WAS_DELETED",
            ResponseCode::TokenIsPaused => "TOKEN_IS_PAUSED",
            ResponseCode::TokenIdRepeatedInTokenList => "TOKEN_ID_REPEATED_IN_TOKEN_LIST",
            ResponseCode::TokenNotAssociatedToAccount => "TOKEN_NOT_ASSOCIATED_TO_ACCOUNT",
            ResponseCode::TokenHasNoFreezeKey => "TOKEN_HAS_NO_FREEZE_KEY",
            ResponseCode::TokenHasNoKycKey => "TOKEN_HAS_NO_KYC_KEY",
            ResponseCode::AccountFrozenForToken => "ACCOUNT_FROZEN_FOR_TOKEN",
            ResponseCode::AccountKycNotGrantedForToken => "ACCOUNT_KYC_NOT_GRANTED_FOR_TOKEN",
            ResponseCode::InsufficientTokenBalance => "INSUFFICIENT_TOKEN_BALANCE",
            ResponseCode::EmptyTokenTransferAccountAmounts => "EMPTY_TOKEN_TRANSFER_ACCOUNT_AMOUNTS",
            ResponseCode::TokenTransferListSizeLimitExceeded => {
                "TOKEN_TRANSFER_LIST_SIZE_LIMIT_EXCEEDED"
            }
            ResponseCode::TransfersNotZeroSumForToken => "TRANSFERS_NOT_ZERO_SUM_FOR_TOKEN",
            ResponseCode::BatchSizeLimitExceeded => "BATCH_SIZE_LIMIT_EXCEEDED",
            ResponseCode::InvalidNftId => "INVALID_NFT_ID",
            ResponseCode::SenderDoesNotOwnNftSerialNo => "SENDER_DOES_NOT_OWN_NFT_SERIAL_NO",
            ResponseCode::NoRemainingAutomaticAssociations => {
                "NO_REMAINING_AUTOMATIC_ASSOCIATIONS"
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseCode::Ok)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
