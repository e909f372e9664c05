//! Types library for the transactional balance ledger
//!
//! Plain data shared by the ledger and anything that drives it: entity
//! identifiers, materialized entity records, transfer lists and the stable
//! response codes a transaction resolves to.
//!
//! # Modules
//! - `ids`: Entity identifiers (AccountId, TokenId, TokenRelKey, NftId)
//! - `account`: Account, token, relationship and NFT records
//! - `transfer`: HBAR and token transfer lists
//! - `response`: Response code taxonomy

pub mod account;
pub mod ids;
pub mod response;
pub mod transfer;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::account::*;
    pub use crate::ids::*;
    pub use crate::response::*;
    pub use crate::transfer::*;
}
