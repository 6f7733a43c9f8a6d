//! # Block Store Contract
//!
//! The ledger's durability backstop. Anything that can hand back every
//! block in index order and insert one more can back a [`Ledger`].
//!
//! ## Contract
//!
//! - `load_ordered` returns records ascending by index. An empty store is
//!   an empty vector, not an error.
//! - `save` treats `index` and `hash` as unique keys and refuses
//!   duplicates. Nothing is ever overwritten.
//!
//! [`Ledger`]: super::chain::Ledger

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::block::BlockRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur inside a block store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("a block with index {0} is already stored")]
    DuplicateIndex(u64),

    #[error("a block with hash {0} is already stored")]
    DuplicateHash(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// BlockStore
// ---------------------------------------------------------------------------

/// Durable keyed storage for block records.
pub trait BlockStore: Send + Sync {
    /// Every stored record, ascending by index.
    fn load_ordered(&self) -> StoreResult<Vec<BlockRecord>>;

    /// Durably insert one record. Must reject a duplicate index or hash.
    fn save(&self, record: &BlockRecord) -> StoreResult<()>;
}

impl<S: BlockStore + ?Sized> BlockStore for Arc<S> {
    fn load_ordered(&self) -> StoreResult<Vec<BlockRecord>> {
        (**self).load_ordered()
    }

    fn save(&self, record: &BlockRecord) -> StoreResult<()> {
        (**self).save(record)
    }
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    fn load_ordered(&self) -> StoreResult<Vec<BlockRecord>> {
        (**self).load_ordered()
    }

    fn save(&self, record: &BlockRecord) -> StoreResult<()> {
        (**self).save(record)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    records: BTreeMap<u64, BlockRecord>,
    hashes: HashSet<String>,
}

/// A process-local store. Nothing survives the process; useful for tests,
/// demos, and `--ephemeral` nodes.
///
/// [`set_offline`](Self::set_offline) makes every call fail with
/// [`StoreError::Unavailable`], which is how tests simulate an unreachable
/// database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with records, e.g. to simulate a pre-existing chain.
    /// Later records win on duplicate index.
    pub fn with_records(records: impl IntoIterator<Item = BlockRecord>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for record in records {
                inner.hashes.insert(record.hash.clone());
                inner.records.insert(record.index, record);
            }
        }
        store
    }

    /// Toggle simulated unavailability.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

impl BlockStore for MemoryStore {
    fn load_ordered(&self) -> StoreResult<Vec<BlockRecord>> {
        self.check_online()?;
        Ok(self.inner.lock().records.values().cloned().collect())
    }

    fn save(&self, record: &BlockRecord) -> StoreResult<()> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        if inner.records.contains_key(&record.index) {
            return Err(StoreError::DuplicateIndex(record.index));
        }
        if inner.hashes.contains(&record.hash) {
            return Err(StoreError::DuplicateHash(record.hash.clone()));
        }
        inner.hashes.insert(record.hash.clone());
        inner.records.insert(record.index, record.clone());
        Ok(())
    }
}
