//! This crate implements a single-writer star notary: an append-only,
//! hash-linked chain of blocks, and a pool of identity-validation requests
//! that decides who may append to it.

pub mod types; // Block, request and finding types shared across modules.
pub mod clock; // Time source for block timestamps and validation windows.
pub mod store; // Key-value storage the chain persists blocks through.
pub mod chain; // Ledger manager: genesis, appends, lookups, validation.
pub mod validation; // Signature verification for challenge messages.
pub mod pool; // Pending and confirmed validation requests.
pub mod api; // HTTP routes over the chain and the pool.
pub mod config; // Defines and loads node configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use chain::Blockchain;
pub use pool::Mempool;
