//! Chain Module
//!
//! This module implements the ledger manager: an append-only sequence of
//! hash-linked blocks stored through a `BlockStore`.
//! - Genesis bootstrap on construction
//! - Serialized appends (one writer at a time)
//! - Lookups by height, hash and address
//! - Block integrity and link validation

mod blockchain;
mod error;
pub mod hash;


pub use blockchain::{Blockchain, genesis_body};
pub use error::{LedgerError, LedgerResult};
