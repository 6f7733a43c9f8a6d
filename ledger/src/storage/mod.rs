//! # Storage Module
//!
//! Everything that makes the audit trail a chain and keeps it on disk.
//!
//! ## Architecture
//!
//! ```text
//! canonical.rs — Deterministic text encoding of payloads and timestamps
//! block.rs     — Block structure, genesis block, hash/verify, flat records
//! store.rs     — BlockStore contract, StoreError, in-memory MemoryStore
//! db.rs        — sled-backed LedgerDB
//! chain.rs     — Ledger: in-memory chain, appends, validation, queries
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! payload → Block → Ledger ──save──→ BlockStore (LedgerDB / MemoryStore)
//!                      ↑                    │
//!                      └─── load_ordered ───┘   (startup)
//! ```
//!
//! ## Design Decisions
//!
//! 1. **SHA-256 over a textual preimage.** The preimage is the decimal
//!    index, the timestamp, the canonical payload, the previous hash, and
//!    the nonce, concatenated. Chains produced by the legacy service hash
//!    the same way, so they still verify.
//!
//! 2. **JSON on disk.** Payloads are arbitrary JSON; bincode cannot
//!    round-trip `serde_json::Value`, so records are stored as JSON.
//!
//! 3. **One writer.** Appends are serialized behind a mutex spanning
//!    read-tail, build, persist, push. Two concurrent appends can never
//!    claim the same index.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod db;
pub mod store;

pub use block::{unix_timestamp, Block, BlockRecord, RecordTimestamp};
pub use chain::{verify_blocks, Ledger, LedgerState, LoadOutcome};
pub use db::LedgerDB;
pub use store::{BlockStore, MemoryStore, StoreError, StoreResult};
