//! # LedgerDB — Persistent Block Store
//!
//! The on-disk [`BlockStore`], built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree           | Key                 | Value                    |
//! |----------------|---------------------|--------------------------|
//! | `blocks`       | `index` (8B BE)     | `json(BlockRecord)`      |
//! | `block_hashes` | `hash` (hex UTF-8)  | `index` (8B BE)          |
//!
//! Indices are stored big-endian so sled's lexicographic ordering matches
//! numeric ordering; a plain scan over `blocks` is already `load_ordered`.
//!
//! ## Atomicity
//!
//! A save checks both uniqueness constraints and writes both trees inside
//! one sled transaction, then flushes. Either the block and its hash index
//! land together or neither does.

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};

use super::block::BlockRecord;
use super::store::{BlockStore, StoreError, StoreResult};
use crate::crypto::is_hex_digest;

/// sled-backed block store.
///
/// # Thread Safety
///
/// sled handles are cheap to clone and safe to share. `LedgerDB` can sit
/// behind an `Arc` or be cloned freely; all clones see the same data.
#[derive(Debug, Clone)]
pub struct LedgerDB {
    /// The underlying sled database handle.
    db: Db,
    /// Block records indexed by big-endian index.
    blocks: Tree,
    /// Reverse index: block hash -> index.
    block_hashes: Tree,
}

impl LedgerDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    ///
    /// Ideal for unit tests: no filesystem side effects, no cleanup.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let blocks = db.open_tree("blocks")?;
        let block_hashes = db.open_tree("block_hashes")?;
        Ok(Self {
            db,
            blocks,
            block_hashes,
        })
    }

    /// Retrieve a record by index.
    pub fn get_block(&self, index: u64) -> StoreResult<Option<BlockRecord>> {
        match self.blocks.get(index.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Retrieve a record by its hex hash.
    pub fn get_block_by_hash(&self, hash: &str) -> StoreResult<Option<BlockRecord>> {
        if !is_hex_digest(hash) {
            return Ok(None);
        }
        match self.block_hashes.get(hash.as_bytes())? {
            Some(index_bytes) => {
                let index = u64::from_be_bytes(
                    index_bytes
                        .as_ref()
                        .try_into()
                        .map_err(|_| StoreError::Serialization("invalid index bytes".into()))?,
                );
                self.get_block(index)
            }
            None => Ok(None),
        }
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl BlockStore for LedgerDB {
    fn load_ordered(&self) -> StoreResult<Vec<BlockRecord>> {
        let mut records = Vec::with_capacity(self.blocks.len());
        for entry in self.blocks.iter() {
            let (_key, value) = entry?;
            records.push(decode_record(&value)?);
        }
        Ok(records)
    }

    fn save(&self, record: &BlockRecord) -> StoreResult<()> {
        let index_key = record.index.to_be_bytes();
        let bytes =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let outcome = (&self.blocks, &self.block_hashes).transaction(|(blocks, hashes)| {
            if blocks.get(&index_key[..])?.is_some() {
                return Err(ConflictableTransactionError::Abort(
                    StoreError::DuplicateIndex(record.index),
                ));
            }
            if hashes.get(record.hash.as_bytes())?.is_some() {
                return Err(ConflictableTransactionError::Abort(
                    StoreError::DuplicateHash(record.hash.clone()),
                ));
            }
            blocks.insert(&index_key[..], bytes.as_slice())?;
            hashes.insert(record.hash.as_bytes(), &index_key[..])?;
            Ok(())
        });

        match outcome {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
        }

        self.db.flush()?;
        tracing::debug!(index = record.index, hash = %record.hash, "block record persisted");
        Ok(())
    }
}

fn decode_record(bytes: &[u8]) -> StoreResult<BlockRecord> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
