//! Block digest
//!
//! A block's hash is the lowercase hex SHA-256 of its compact JSON
//! serialization with the `hash` field set to the empty string.

use crate::Block;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of arbitrary bytes
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Canonical bytes of a block as hashed: the JSON form with `hash` cleared
pub fn canonical_bytes(block: &Block) -> Result<Vec<u8>, serde_json::Error> {
    let mut unsealed = block.clone();
    unsealed.hash.clear();
    serde_json::to_vec(&unsealed)
}

/// Digest of a block, independent of whatever is in its `hash` field
pub fn block_digest(block: &Block) -> Result<String, serde_json::Error> {
    Ok(digest(&canonical_bytes(block)?))
}
