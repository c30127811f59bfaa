//! Blockchain Module
//!
//! The ledger manager. Blocks are stored under their height, each one
//! carrying the hash of the block before it.
//!
//! # Write Path
//! Every write (genesis bootstrap and append) runs under a single async
//! mutex held across the whole read-height / read-tail / write sequence, so
//! two appends can never be assigned the same height.
//!
//! # Read Path
//! Reads take no lock. Blocks below the current height never change through
//! this API, so a reader that fixes its upper bound first sees a stable prefix.

use super::error::{LedgerError, LedgerResult};
use super::hash::block_digest;
use crate::{
    Block, Body, Discrepancy, DiscrepancyKind, Star,
    clock::Clock,
    store::BlockStore,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Body of the well-known genesis block
pub fn genesis_body() -> Body {
    Body {
        address: "1JsrVe7pHZGUrJB4NnjfXwDckAMmiXsDHN".to_string(),
        star: Star {
            ra: "17h 22m 13.1s".to_string(),
            dec: "-27° 14' 8.2".to_string(),
            story: "466f756e642073746172207573696e672068747470733a2f2f7777772e676f6f676c652e636f6d2f736b792f"
                .to_string(),
        },
    }
}

/// Ledger manager over a block store
pub struct Blockchain {
    store: Arc<dyn BlockStore>,
    clock: Arc<dyn Clock>,
    /// Serializes writers; readers never take it
    write_lock: Mutex<()>,
}

impl Blockchain {
    /// Creates the ledger and bootstraps the genesis block if the store is empty
    ///
    /// # Arguments
    /// * `store` - Backing key-value store (heights as keys)
    /// * `clock` - Time source for block timestamps
    pub async fn new(store: Arc<dyn BlockStore>, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let chain = Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        };
        chain.bootstrap_genesis().await?;
        Ok(chain)
    }

    /// Height of the tip: number of stored blocks minus one, `-1` when empty
    pub async fn height(&self) -> LedgerResult<i64> {
        let count = self.store.count().await?;
        Ok(count as i64 - 1)
    }

    /// Write the genesis block if the chain is empty
    ///
    /// Returns the new genesis block, or `None` if one already existed.
    pub async fn bootstrap_genesis(&self) -> LedgerResult<Option<Block>> {
        let _guard = self.write_lock.lock().await;

        let height = self.height().await?;
        if height >= 0 {
            info!("Genesis block already exists, current height is {}", height);
            return Ok(None);
        }

        let genesis = self.write_genesis().await?;
        Ok(Some(genesis))
    }

    /// Get a block by height
    pub async fn get(&self, height: u64) -> LedgerResult<Block> {
        debug!("Fetching block at height {}", height);
        let bytes = self
            .store
            .get(height)
            .await?
            .ok_or(LedgerError::NotFound { height })?;
        decode(height, &bytes)
    }

    /// Find a block by its hash (full scan)
    pub async fn get_by_hash(&self, hash: &str) -> LedgerResult<Block> {
        debug!("Looking up block by hash {}", hash);
        self.scan_blocks()
            .await?
            .into_iter()
            .find(|block| block.hash == hash)
            .ok_or_else(|| LedgerError::HashNotFound(hash.to_string()))
    }

    /// All blocks registered by `address`, in height order (full scan)
    pub async fn get_all_by_address(&self, address: &str) -> LedgerResult<Vec<Block>> {
        debug!("Looking up blocks for address {}", address);
        let blocks = self
            .scan_blocks()
            .await?
            .into_iter()
            .filter(|block| block.address() == Some(address))
            .collect();
        Ok(blocks)
    }

    /// Every decodable block in height order; undecodable records are skipped
    async fn scan_blocks(&self) -> LedgerResult<Vec<Block>> {
        let mut blocks = Vec::new();
        for (height, bytes) in self.store.scan().await? {
            match decode(height, &bytes) {
                Ok(block) => blocks.push(block),
                Err(e) => warn!("Skipping block #{} during scan: {}", height, e),
            }
        }
        Ok(blocks)
    }

    /// Append a new block carrying `body`
    ///
    /// Height, timestamp, previous hash and hash are all assigned here. If the
    /// store turns out to be empty, a genesis block is written first and the
    /// new block follows it at height 1. The body is stored as given.
    pub async fn append(&self, body: impl Into<Value>) -> LedgerResult<Block> {
        let _guard = self.write_lock.lock().await;

        let height = self.height().await?;
        let (next_height, previous_hash) = if height < 0 {
            warn!("Chain is empty on append, writing genesis block first");
            (1, self.write_genesis().await?.hash)
        } else {
            let tip = height as u64;
            (tip + 1, self.get(tip).await?.hash)
        };

        let mut block = Block::new(next_height, body, self.clock.now(), previous_hash);
        block.hash = block_digest(&block)?;

        self.persist(&block).await?;
        info!("Block #{} appended with hash {}", block.height, block.hash);

        Ok(block)
    }

    /// Recompute a block's digest and compare it with its stored hash
    ///
    /// An unreadable stored value counts as a mismatch.
    pub async fn validate_integrity(&self, height: u64) -> LedgerResult<bool> {
        let Some(block) = self.load_checked(height).await? else {
            return Ok(false);
        };

        let valid = block_digest(&block)? == block.hash;
        if !valid {
            warn!("Block #{} hash does not match its contents", height);
        }
        Ok(valid)
    }

    /// Check that a block points at the hash of the block before it
    ///
    /// Genesis is valid iff its previous hash is empty.
    pub async fn validate_link(&self, height: u64) -> LedgerResult<bool> {
        let Some(block) = self.load_checked(height).await? else {
            return Ok(false);
        };

        if height == 0 {
            return Ok(block.previous_block_hash.is_empty());
        }

        let Some(previous) = self.load_checked(height - 1).await? else {
            return Ok(false);
        };

        let valid = block.previous_block_hash == previous.hash;
        if !valid {
            warn!("Block #{} does not link to block #{}", height, height - 1);
        }
        Ok(valid)
    }

    /// Validate every block up to the current tip
    ///
    /// The tip is read once up front; blocks appended while the scan runs are
    /// not examined. An empty result means the chain is valid.
    pub async fn validate_chain(&self) -> LedgerResult<Vec<Discrepancy>> {
        let tip = self.height().await?;
        let mut discrepancies = Vec::new();
        if tip < 0 {
            return Ok(discrepancies);
        }

        for height in 0..=tip as u64 {
            if !self.validate_integrity(height).await? {
                discrepancies.push(Discrepancy {
                    kind: DiscrepancyKind::HashMismatch,
                    height,
                });
            }
            if !self.validate_link(height).await? {
                discrepancies.push(Discrepancy {
                    kind: DiscrepancyKind::BrokenLink,
                    height,
                });
            }
        }

        info!(
            "Chain validated up to height {}: {} discrepancies",
            tip,
            discrepancies.len()
        );
        Ok(discrepancies)
    }

    /// Caller must hold `write_lock`
    async fn write_genesis(&self) -> LedgerResult<Block> {
        let mut genesis = Block::new(0, genesis_body(), self.clock.now(), String::new());
        genesis.hash = block_digest(&genesis)?;

        self.persist(&genesis).await?;
        info!("Genesis block inserted with hash {}", genesis.hash);

        Ok(genesis)
    }

    async fn persist(&self, block: &Block) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(block)?;
        self.store.put(block.height, bytes).await?;
        Ok(())
    }

    /// Load a block for validation: `NotFound` if absent, `None` if undecodable
    async fn load_checked(&self, height: u64) -> LedgerResult<Option<Block>> {
        match self.get(height).await {
            Ok(block) => Ok(Some(block)),
            Err(LedgerError::Corrupt { reason, .. }) => {
                warn!("Block #{} cannot be decoded: {}", height, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn decode(height: u64, bytes: &[u8]) -> LedgerResult<Block> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Corrupt {
        height,
        reason: e.to_string(),
    })
}
