// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # DiaBot Ledger — Core Library
//!
//! The tamper-evident audit trail behind DiaBot's diagnostic results. Every
//! saved diagnosis lands in an append-only chain of SHA-256-linked blocks;
//! change one byte of history and validation says so.
//!
//! This is not a blockchain in the consensus sense. There is one writer, no
//! peers, no proof-of-work. Think write-ahead log with cryptographic linking.
//!
//! ## Architecture
//!
//! - **crypto** — SHA-256 helpers. One hash function, used everywhere.
//! - **storage** — Blocks, canonical payload encoding, the `BlockStore`
//!   contract with its sled and in-memory backends, and the `Ledger` itself.
//! - **record** — The diagnostic-record envelope carried in block payloads.
//! - **config** — Constants and the ledger's failure policies.
//! - **error** — Error types shared across the crate.
//!
//! ## Quick Start
//!
//! ```
//! use diabot_ledger::config::LedgerConfig;
//! use diabot_ledger::storage::{Ledger, MemoryStore};
//!
//! let ledger = Ledger::open(MemoryStore::new(), LedgerConfig::default());
//! ledger
//!     .append_diagnostic_record(&serde_json::json!({ "patient": "A" }))
//!     .unwrap();
//! assert_eq!(ledger.len(), 2);
//! assert!(ledger.validate_chain());
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod record;
pub mod storage;

pub use error::{ChainViolation, LedgerError, LedgerResult};
pub use record::DiagnosticEnvelope;
pub use storage::{Block, BlockRecord, BlockStore, Ledger, LedgerDB, MemoryStore};
