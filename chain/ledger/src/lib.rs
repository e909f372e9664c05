//! Transactional Balance Ledger
//!
//! Staged, all-or-nothing mutation of account, token-relationship and NFT
//! state over pluggable backing stores, with a double-entry HBAR ledger and
//! atomic cross-asset transfers on top.
//!
//! # Modules
//! - `errors`: Ledger and backing-store error types
//! - `config`: Ledger limits and feature flags
//! - `properties`: Per-entity property enumerations and typed values
//! - `backing`: Backing store trait, in-memory store and nested backing
//! - `changes`: Change-sets and the batch handed to commit interceptors
//! - `transactional`: Generic staged ledger with begin/commit/rollback
//! - `interceptor`: Commit interceptor hook and the accounts zero-sum preview
//! - `net_transfers`: Sorted per-account net adjustment lists
//! - `balance_change`: One leg of a transfer
//! - `scoped_check`: Account checks over staged properties
//! - `semantic_checks`: Stateless transfer-list checks
//! - `token_store`: Token business rules over the token ledgers
//! - `historian`: Record hooks around commit
//! - `entity_ids`: Account number allocation
//! - `customizer`: Bulk account property staging
//! - `hedera_ledger`: Double-entry ledger over accounts and tokens
//! - `auto_creation`: Accounts spawned for unused aliases
//! - `transfer_logic`: Atomic multi-leg transfers

pub mod auto_creation;
pub mod backing;
pub mod balance_change;
pub mod changes;
pub mod config;
pub mod customizer;
pub mod entity_ids;
pub mod errors;
pub mod hedera_ledger;
pub mod historian;
pub mod interceptor;
pub mod net_transfers;
pub mod properties;
pub mod scoped_check;
pub mod semantic_checks;
pub mod token_store;
pub mod transactional;
pub mod transfer_logic;

pub use errors::LedgerError;
pub use hedera_ledger::HederaLedger;
pub use transactional::TransactionalLedger;
pub use transfer_logic::TransferLogic;
