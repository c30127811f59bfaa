//! Validation Pool Module
//!
//! This module tracks identities that asked to write to the chain:
//! - Pending requests, each with a challenge message to sign
//! - Confirmed requests whose signature checked out
//! - Scheduled evictions once the validation window runs out
//!
//! A confirmation is single-use: it is consumed after the block it gated
//! has been appended.

mod eviction;
mod mempool;

#[cfg(test)]
mod tests;

pub use mempool::Mempool;
