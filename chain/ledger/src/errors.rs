//! Ledger error types
//!
//! Three families share one enum:
//! - usage errors: a caller drove the ledger out of protocol (no open
//!   transaction, double create, unknown key)
//! - business-rule failures: an expected transaction outcome with a stable
//!   response code; the caller resolves these with `rollback()`
//! - commit-time store failures: the backing store rejected a flush and its
//!   state relative to the ledger is unknown

use thiserror::Error;
use types::ids::AccountId;
use types::response::ResponseCode;

/// Failure reported by a backing store while flushing a commit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Backing store failure on {key}: {reason}")]
pub struct BackingStoreError {
    pub key: String,
    pub reason: String,
}

impl BackingStoreError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("A transaction is already active")]
    TransactionAlreadyActive,

    #[error("Entity already exists: {key}")]
    AlreadyExists { key: String },

    #[error("Entity does not exist: {key}")]
    MissingEntity { key: String },

    #[error("Entity is pending removal: {key}")]
    PendingRemoval { key: String },

    #[error("No token relationship ledger is configured")]
    TokenLedgersUnavailable,

    #[error("Insufficient funds in {account}: balance {balance}, adjustment {adjustment}")]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        adjustment: i64,
    },

    #[error("Account {account} is deleted")]
    DeletedAccount { account: AccountId },

    #[error("Account {account} is expired and pending removal")]
    DetachedAccount { account: AccountId },

    #[error("Transfer list does not sum to zero: net {net}")]
    NonZeroNetTransfers { net: i64 },

    #[error("Pending adjustments are inconsistent: net {net}")]
    InconsistentAdjustments { net: i64 },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(ResponseCode),

    #[error("Commit rejected: {reason}")]
    CommitRejected { reason: String },

    #[error("Store error: {0}")]
    Store(#[from] BackingStoreError),
}

impl LedgerError {
    pub fn missing(key: impl ToString) -> Self {
        LedgerError::MissingEntity {
            key: key.to_string(),
        }
    }

    pub fn already_exists(key: impl ToString) -> Self {
        LedgerError::AlreadyExists {
            key: key.to_string(),
        }
    }

    /// Response code a failed transaction reports for this error.
    ///
    /// Usage and store errors are not user outcomes and map to `FailInvalid`.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            LedgerError::InsufficientFunds { .. } => ResponseCode::InsufficientAccountBalance,
            LedgerError::DeletedAccount { .. } => ResponseCode::AccountDeleted,
            LedgerError::DetachedAccount { .. } => ResponseCode::AccountExpiredAndPendingRemoval,
            LedgerError::NonZeroNetTransfers { .. } => ResponseCode::InvalidAccountAmounts,
            LedgerError::InvalidTransaction(code) => *code,
            _ => ResponseCode::FailInvalid,
        }
    }

    /// Whether this error is an expected transaction outcome rather than a
    /// pipeline bug or store failure.
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::DeletedAccount { .. }
                | LedgerError::DetachedAccount { .. }
                | LedgerError::NonZeroNetTransfers { .. }
                | LedgerError::InconsistentAdjustments { .. }
                | LedgerError::InvalidTransaction(_)
        )
    }
}
