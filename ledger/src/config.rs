//! # Ledger Configuration & Constants
//!
//! Every magic value the ledger depends on lives here. Changing any of the
//! hashing-related constants after blocks have been written invalidates
//! every existing chain, so treat them as frozen.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Ledger format version reported by the node.
pub const LEDGER_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Chain Constants
// ---------------------------------------------------------------------------

/// `previous_hash` of the genesis block. There is nothing before it.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Payload carried by the genesis block.
pub const GENESIS_PAYLOAD: &str = "Genesis Block - DiaBot Medical Records";

/// Nonce assigned to every block. Kept for record-format compatibility;
/// there is no proof-of-work search.
pub const DEFAULT_NONCE: u64 = 0;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LENGTH: usize = 64;

/// Value of the `type` tag on diagnostic-record payloads.
pub const DIAGNOSTIC_RECORD_TYPE: &str = "diagnostic_record";

// ---------------------------------------------------------------------------
// Failure Policies
// ---------------------------------------------------------------------------

/// What `Ledger::append` does when the store refuses a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistFailurePolicy {
    /// Surface the failure and leave the in-memory chain untouched.
    #[default]
    Reject,
    /// Log the failure and append in memory anyway. The block is lost on
    /// restart; the in-memory chain diverges from durable storage.
    Degrade,
}

/// What decoding a stored block does with an unparseable text timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampRecovery {
    /// Fail the decode with `LedgerError::InvalidTimestamp`.
    #[default]
    Reject,
    /// Replace the timestamp with the current time. The block's stored hash
    /// is kept, so it will fail validation afterwards.
    SubstituteNow,
}

/// Runtime configuration for a [`Ledger`](crate::storage::Ledger).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Policy applied when persisting an appended block fails.
    pub persist_failure: PersistFailurePolicy,
    /// Policy applied when a stored timestamp cannot be parsed.
    pub timestamp_recovery: TimestampRecovery,
}

impl LedgerConfig {
    /// Configuration matching the legacy service behavior: persistence
    /// failures are logged but not raised, bad timestamps become "now".
    pub fn lenient() -> Self {
        Self {
            persist_failure: PersistFailurePolicy::Degrade,
            timestamp_recovery: TimestampRecovery::SubstituteNow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let config = LedgerConfig::default();
        assert_eq!(config.persist_failure, PersistFailurePolicy::Reject);
        assert_eq!(config.timestamp_recovery, TimestampRecovery::Reject);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{ "persist_failure": "degrade" }"#).unwrap();
        assert_eq!(config.persist_failure, PersistFailurePolicy::Degrade);
        assert_eq!(config.timestamp_recovery, TimestampRecovery::Reject);
    }

    #[test]
    fn genesis_previous_hash_is_not_a_digest() {
        assert_ne!(GENESIS_PREVIOUS_HASH.len(), HASH_HEX_LENGTH);
    }
}
