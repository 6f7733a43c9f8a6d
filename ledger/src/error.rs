//! Error types for the ledger.
//!
//! [`LedgerError`] covers the operations that can fail outright (building,
//! decoding, and persisting blocks). [`ChainViolation`] is what validation
//! reports; it is a finding about the data, never raised as a failure of
//! the call itself.

use thiserror::Error;

use crate::storage::store::StoreError;

/// Result alias used across the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors returned by block construction and ledger writes.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The block could not be built: non-finite timestamp or a payload
    /// that has no JSON representation.
    #[error("block construction failed: {0}")]
    Construction(String),

    /// A stored block carries a text timestamp that does not parse.
    #[error("block {index} has an unparseable timestamp {raw:?}")]
    InvalidTimestamp {
        /// Index of the offending block.
        index: u64,
        /// The timestamp text as stored.
        raw: String,
    },

    /// The store refused or failed to write an appended block. The
    /// in-memory chain was not advanced.
    #[error("failed to persist block {index}: {source}")]
    PersistFailed {
        /// Index of the block that was not persisted.
        index: u64,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The in-memory chain is running on a fallback genesis block and the
    /// store still cannot be loaded. Appending would write a block linked to
    /// a genesis that was never persisted.
    #[error("ledger is not in sync with its store: {reason}")]
    OutOfSync {
        /// Why the most recent load failed.
        reason: String,
    },
}

/// The first integrity problem found while walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    /// The genesis block does not point at the sentinel previous hash.
    #[error("genesis block has previous_hash {found:?}, expected \"0\"")]
    GenesisLink {
        /// The previous hash actually stored on block 0.
        found: String,
    },

    /// A block sits at the wrong position.
    #[error("block at position {position} has index {found}")]
    IndexGap {
        /// Position in the chain.
        position: usize,
        /// Index stored on the block.
        found: u64,
    },

    /// A block's stored hash does not match its contents.
    #[error("block {index} hash mismatch: stored={stored}, computed={computed}")]
    HashMismatch {
        /// Index of the block.
        index: u64,
        /// Hash stored on the block.
        stored: String,
        /// Hash recomputed from the block's fields.
        computed: String,
    },

    /// A block's previous hash does not match its predecessor's hash.
    #[error("block {index} links to {found}, predecessor hash is {expected}")]
    BrokenLink {
        /// Index of the block.
        index: u64,
        /// Hash of the predecessor.
        expected: String,
        /// `previous_hash` stored on the block.
        found: String,
    },
}

impl ChainViolation {
    /// Index of the block the violation was found on.
    pub fn block_index(&self) -> u64 {
        match self {
            Self::GenesisLink { .. } => 0,
            Self::IndexGap { position, .. } => *position as u64,
            Self::HashMismatch { index, .. } | Self::BrokenLink { index, .. } => *index,
        }
    }
}
