//! # Block Structure
//!
//! A block is one entry of the audit trail: a payload, the moment it was
//! written, and a SHA-256 link to the block before it.
//!
//! ## Block Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  index: u64            (0 = genesis)          │
//! │  timestamp: f64        (Unix seconds)         │
//! │  data: JSON            (opaque payload)       │
//! │  previous_hash: hex    ("0" for genesis)      │
//! │  nonce: u64            (always 0)             │
//! │  hash: hex             (SHA-256, see below)   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! `hash = SHA-256(index ‖ timestamp ‖ canonical(data) ‖ previous_hash ‖ nonce)`
//! where every field is rendered as text by [`canonical`](super::canonical).
//!
//! ## Records
//!
//! [`BlockRecord`] is the flat form that goes to storage and over the wire.
//! Decoding a record keeps the hash it carries instead of recomputing it;
//! otherwise an edited record would quietly "heal" on load and validation
//! could never catch it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::canonical::{canonical_payload, format_timestamp};
use crate::config::{TimestampRecovery, DEFAULT_NONCE, GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH};
use crate::crypto::hash::sha256_hex_multi;
use crate::error::{ChainViolation, LedgerError, LedgerResult};

/// Current wall-clock time as fractional Unix seconds (microsecond
/// precision).
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// An immutable, self-hashing ledger entry.
///
/// There is no way to obtain a `Block` whose hash was not either computed
/// from its fields at construction or read back from a stored record.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    index: u64,
    timestamp: f64,
    data: Value,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    /// Build a block and compute its hash.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Construction`] if `timestamp` is NaN or infinite.
    pub fn new(
        index: u64,
        timestamp: f64,
        data: Value,
        previous_hash: impl Into<String>,
        nonce: u64,
    ) -> LedgerResult<Self> {
        if !timestamp.is_finite() {
            return Err(LedgerError::Construction(format!(
                "block {index} timestamp is not finite: {timestamp}"
            )));
        }

        Ok(Self::assemble(index, timestamp, data, previous_hash.into(), nonce))
    }

    fn assemble(index: u64, timestamp: f64, data: Value, previous_hash: String, nonce: u64) -> Self {
        let hash = compute_block_hash(index, timestamp, &data, &previous_hash, nonce);
        Block {
            index,
            timestamp,
            data,
            previous_hash,
            nonce,
            hash,
        }
    }

    /// Construct the genesis block: index 0, the fixed genesis payload, and
    /// the `"0"` sentinel as previous hash.
    pub fn genesis(timestamp: f64) -> LedgerResult<Self> {
        Self::new(
            0,
            timestamp,
            Value::String(GENESIS_PAYLOAD.to_string()),
            GENESIS_PREVIOUS_HASH,
            DEFAULT_NONCE,
        )
    }

    /// Construct a genesis block stamped with the current time.
    pub fn genesis_now() -> Self {
        Self::assemble(
            0,
            unix_timestamp(),
            Value::String(GENESIS_PAYLOAD.to_string()),
            GENESIS_PREVIOUS_HASH.to_string(),
            DEFAULT_NONCE,
        )
    }

    /// Construct the block that follows `parent`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Construction`] if `parent` already sits at the last
    /// representable index, or `timestamp` is not finite.
    pub fn next(parent: &Block, data: Value, timestamp: f64) -> LedgerResult<Self> {
        let index = parent.index.checked_add(1).ok_or_else(|| {
            LedgerError::Construction(format!("no index after {}", parent.index))
        })?;
        Self::new(
            index,
            timestamp,
            data,
            parent.hash.clone(),
            DEFAULT_NONCE,
        )
    }

    /// Recompute the hash from the block's other five fields.
    pub fn compute_hash(&self) -> String {
        compute_block_hash(
            self.index,
            self.timestamp,
            &self.data,
            &self.previous_hash,
            self.nonce,
        )
    }

    /// Check that the stored hash matches the block's contents.
    ///
    /// Linkage to the predecessor is the ledger's job; this only looks at
    /// the block itself.
    pub fn verify(&self) -> Result<(), ChainViolation> {
        let computed = self.compute_hash();
        if computed != self.hash {
            return Err(ChainViolation::HashMismatch {
                index: self.index,
                stored: self.hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// True for the block at index 0.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Flatten into the persisted record form.
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            index: self.index,
            timestamp: RecordTimestamp::Numeric(self.timestamp),
            data: self.data.clone(),
            previous_hash: self.previous_hash.clone(),
            hash: self.hash.clone(),
            nonce: self.nonce,
        }
    }

    /// Rebuild a block from a stored record, keeping the record's hash.
    ///
    /// Text timestamps are parsed as decimal floats. When parsing fails,
    /// `recovery` decides between an error and substituting the current
    /// time.
    pub fn from_record(record: BlockRecord, recovery: TimestampRecovery) -> LedgerResult<Self> {
        let timestamp = match record.timestamp {
            RecordTimestamp::Numeric(ts) if ts.is_finite() => ts,
            RecordTimestamp::Numeric(ts) => {
                return Err(LedgerError::InvalidTimestamp {
                    index: record.index,
                    raw: ts.to_string(),
                })
            }
            RecordTimestamp::Text(raw) => match parse_timestamp(&raw) {
                Some(ts) => ts,
                None => match recovery {
                    TimestampRecovery::Reject => {
                        return Err(LedgerError::InvalidTimestamp {
                            index: record.index,
                            raw,
                        })
                    }
                    TimestampRecovery::SubstituteNow => {
                        let now = unix_timestamp();
                        tracing::warn!(
                            index = record.index,
                            raw = %raw,
                            substitute = now,
                            "unparseable block timestamp replaced with current time"
                        );
                        now
                    }
                },
            },
        };

        Ok(Block {
            index: record.index,
            timestamp,
            data: record.data,
            previous_hash: record.previous_hash,
            nonce: record.nonce,
            hash: record.hash,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|ts| ts.is_finite())
}

/// Compute the SHA-256 block hash from its constituent fields.
fn compute_block_hash(
    index: u64,
    timestamp: f64,
    data: &Value,
    previous_hash: &str,
    nonce: u64,
) -> String {
    let index = index.to_string();
    let timestamp = format_timestamp(timestamp);
    let payload = canonical_payload(data);
    let nonce = nonce.to_string();
    sha256_hex_multi(&[
        index.as_bytes(),
        timestamp.as_bytes(),
        payload.as_bytes(),
        previous_hash.as_bytes(),
        nonce.as_bytes(),
    ])
}

// ---------------------------------------------------------------------------
// BlockRecord
// ---------------------------------------------------------------------------

/// A stored timestamp. The legacy schema kept timestamps as text, so both
/// shapes are accepted on the way in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTimestamp {
    Numeric(f64),
    Text(String),
}

/// The flat six-field form of a block, as persisted and transferred.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: u64,
    pub timestamp: RecordTimestamp,
    pub data: Value,
    pub previous_hash: String,
    pub hash: String,
    #[serde(default)]
    pub nonce: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
