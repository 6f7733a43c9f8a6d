//! # Ledger — In-Memory Chain Management
//!
//! The [`Ledger`] owns the ordered block sequence and a handle to its
//! [`BlockStore`]. It is the only thing that grows the chain.
//!
//! ## Lifecycle
//!
//! ```text
//! UNINITIALIZED ──load() / first access──→ LOADED ──append()──→ LOADED ...
//! ```
//!
//! Loading reads every stored record in index order. An empty store gets a
//! freshly persisted genesis block. An unreachable store, or one holding
//! records that cannot be decoded, leaves the ledger running on an
//! in-memory genesis block and reports [`LoadOutcome::Degraded`].
//!
//! ## Writes
//!
//! `append` holds the writer mutex across read-tail → build → persist →
//! push. The chain itself sits behind an `RwLock` that is only taken for
//! writing during the final push, so readers never wait on store I/O.
//!
//! ## Validation
//!
//! [`verify_blocks`] walks the whole sequence and reports the first
//! [`ChainViolation`]. A failed validation is a result, not an error.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::block::{unix_timestamp, Block, BlockRecord};
use super::store::BlockStore;
use crate::config::{LedgerConfig, PersistFailurePolicy, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainViolation, LedgerError, LedgerResult};
use crate::record::DiagnosticEnvelope;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// How the most recent load went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The chain was rebuilt from `blocks` stored records.
    Restored { blocks: usize },
    /// The store was empty; a genesis block was created and persisted.
    Bootstrapped,
    /// The ledger is running on an in-memory genesis block only. New blocks
    /// may not be durable.
    Degraded { reason: String },
}

impl LoadOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Uninitialized,
    Loaded { degraded: bool },
}

#[derive(Debug, Default)]
struct ChainState {
    blocks: Vec<Block>,
    outcome: Option<LoadOutcome>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The audit ledger: an append-only, hash-chained sequence of blocks backed
/// by a [`BlockStore`].
///
/// Construct one per process and share it (`Arc<Ledger<_>>`); every method
/// takes `&self`.
pub struct Ledger<S: BlockStore> {
    store: S,
    config: LedgerConfig,
    chain: RwLock<ChainState>,
    /// Serializes appends and loads.
    writer: Mutex<()>,
}

impl<S: BlockStore> Ledger<S> {
    /// Create an unloaded ledger. The chain is read from the store on the
    /// first call that needs it, or on an explicit [`load`](Self::load).
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            chain: RwLock::new(ChainState::default()),
            writer: Mutex::new(()),
        }
    }

    /// Create a ledger and load it immediately.
    pub fn open(store: S, config: LedgerConfig) -> Self {
        let ledger = Self::new(store, config);
        ledger.load();
        ledger
    }

    /// (Re)build the in-memory chain from the store.
    ///
    /// Never fails: problems reading the store end in
    /// [`LoadOutcome::Degraded`] with the reason logged at error level.
    pub fn load(&self) -> LoadOutcome {
        let _writer = self.writer.lock();
        self.load_locked()
    }

    fn load_locked(&self) -> LoadOutcome {
        let (blocks, outcome) = match self.store.load_ordered() {
            Ok(records) if records.is_empty() => self.bootstrap(),
            Ok(records) => match self.decode(records) {
                Ok(blocks) => {
                    let count = blocks.len();
                    info!(blocks = count, "ledger restored from store");
                    (blocks, LoadOutcome::Restored { blocks: count })
                }
                Err(e) => Self::degraded(format!("stored chain could not be decoded: {e}")),
            },
            Err(e) => Self::degraded(format!("store unreachable: {e}")),
        };

        let mut state = self.chain.write();
        state.blocks = blocks;
        state.outcome = Some(outcome.clone());
        outcome
    }

    fn decode(&self, records: Vec<BlockRecord>) -> LedgerResult<Vec<Block>> {
        records
            .into_iter()
            .map(|record| Block::from_record(record, self.config.timestamp_recovery))
            .collect()
    }

    fn bootstrap(&self) -> (Vec<Block>, LoadOutcome) {
        let genesis = Block::genesis_now();
        match self.store.save(&genesis.to_record()) {
            Ok(()) => {
                info!(hash = %genesis.hash(), "empty store, genesis block persisted");
                (vec![genesis], LoadOutcome::Bootstrapped)
            }
            Err(e) => {
                let reason = format!("genesis block could not be persisted: {e}");
                error!(error = %e, "falling back to in-memory genesis block");
                (vec![genesis], LoadOutcome::Degraded { reason })
            }
        }
    }

    fn degraded(reason: String) -> (Vec<Block>, LoadOutcome) {
        error!(reason = %reason, "ledger load failed, continuing on in-memory genesis block");
        (vec![Block::genesis_now()], LoadOutcome::Degraded { reason })
    }

    fn ensure_loaded(&self) {
        if self.chain.read().outcome.is_some() {
            return;
        }
        let _writer = self.writer.lock();
        if self.chain.read().outcome.is_none() {
            self.load_locked();
        }
    }

    fn tail(&self) -> Block {
        match self.chain.read().blocks.last() {
            Some(block) => block.clone(),
            None => unreachable!("a loaded chain always holds a genesis block"),
        }
    }

    /// The newest block. Loads the chain first if needed.
    pub fn latest(&self) -> Block {
        self.ensure_loaded();
        self.tail()
    }

    /// Append any serializable payload as a new block.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Construction`] when `data` has no JSON form. The
    ///   chain is untouched.
    /// - [`LedgerError::PersistFailed`] when the store refuses the block and
    ///   the policy is [`PersistFailurePolicy::Reject`]. The chain is
    ///   untouched.
    /// - [`LedgerError::OutOfSync`] when the ledger is degraded, the policy
    ///   is [`PersistFailurePolicy::Reject`], and reloading still fails.
    pub fn append<T: Serialize + ?Sized>(&self, data: &T) -> LedgerResult<Block> {
        let payload = serde_json::to_value(data)
            .map_err(|e| LedgerError::Construction(format!("payload is not serializable: {e}")))?;
        self.append_payload(payload)
    }

    /// Append a JSON payload as a new block.
    ///
    /// Under [`PersistFailurePolicy::Reject`] a degraded ledger reloads from
    /// the store first and refuses the append with
    /// [`LedgerError::OutOfSync`] if the store still cannot be loaded.
    pub fn append_payload(&self, data: Value) -> LedgerResult<Block> {
        let _writer = self.writer.lock();
        let strict = self.config.persist_failure == PersistFailurePolicy::Reject;
        let needs_load = match &self.chain.read().outcome {
            None => true,
            Some(outcome) => strict && outcome.is_degraded(),
        };
        if needs_load {
            if let LoadOutcome::Degraded { reason } = self.load_locked() {
                if strict {
                    error!(reason = %reason, "append refused, store not loaded");
                    return Err(LedgerError::OutOfSync { reason });
                }
            }
        }

        let tail = self.tail();
        let block = Block::next(&tail, data, unix_timestamp())?;

        if let Err(source) = self.store.save(&block.to_record()) {
            match self.config.persist_failure {
                PersistFailurePolicy::Reject => {
                    error!(index = block.index(), error = %source, "block not persisted, append rejected");
                    return Err(LedgerError::PersistFailed {
                        index: block.index(),
                        source,
                    });
                }
                PersistFailurePolicy::Degrade => {
                    error!(
                        index = block.index(),
                        error = %source,
                        "block not persisted, appending in memory only"
                    );
                }
            }
        }

        self.chain.write().blocks.push(block.clone());
        info!(index = block.index(), hash = %block.hash(), "block appended");
        Ok(block)
    }

    /// Wrap `record` in the diagnostic envelope and append it.
    pub fn append_diagnostic_record<T: Serialize + ?Sized>(&self, record: &T) -> LedgerResult<Block> {
        let record = serde_json::to_value(record)
            .map_err(|e| LedgerError::Construction(format!("record is not serializable: {e}")))?;
        let envelope = DiagnosticEnvelope::new(record, unix_timestamp());
        self.append_payload(envelope.into_payload())
    }

    /// True if every block hashes correctly and links to its predecessor.
    pub fn validate_chain(&self) -> bool {
        match self.verify_chain() {
            Ok(()) => true,
            Err(violation) => {
                warn!(%violation, "chain validation failed");
                false
            }
        }
    }

    /// Walk the chain and report the first integrity violation.
    pub fn verify_chain(&self) -> Result<(), ChainViolation> {
        self.ensure_loaded();
        let state = self.chain.read();
        verify_blocks(&state.blocks)
    }

    /// The caller records of every diagnostic block, oldest first.
    pub fn records(&self) -> Vec<Value> {
        self.ensure_loaded();
        self.chain
            .read()
            .blocks
            .iter()
            .filter_map(|block| DiagnosticEnvelope::unwrap_record(block.data()))
            .collect()
    }

    /// Snapshot of the whole chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.ensure_loaded();
        self.chain.read().blocks.clone()
    }

    /// The block at `index`, if any.
    pub fn block(&self, index: u64) -> Option<Block> {
        self.ensure_loaded();
        let state = self.chain.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| state.blocks.get(i))
            .cloned()
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.ensure_loaded();
        self.chain.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> LedgerState {
        match &self.chain.read().outcome {
            None => LedgerState::Uninitialized,
            Some(outcome) => LedgerState::Loaded {
                degraded: outcome.is_degraded(),
            },
        }
    }

    /// Result of the most recent load, if one has happened.
    pub fn load_outcome(&self) -> Option<LoadOutcome> {
        self.chain.read().outcome.clone()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Check a block sequence against the chain invariants.
///
/// For every block, in order: its index equals its position, its stored
/// hash matches its contents, and (past genesis) its `previous_hash` equals
/// the predecessor's hash. Block 0 must carry the `"0"` sentinel.
pub fn verify_blocks(blocks: &[Block]) -> Result<(), ChainViolation> {
    let Some(genesis) = blocks.first() else {
        return Ok(());
    };
    if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
        return Err(ChainViolation::GenesisLink {
            found: genesis.previous_hash().to_string(),
        });
    }

    for (position, block) in blocks.iter().enumerate() {
        if block.index() != position as u64 {
            return Err(ChainViolation::IndexGap {
                position,
                found: block.index(),
            });
        }
        block.verify()?;
        if position > 0 {
            let previous = &blocks[position - 1];
            if block.previous_hash() != previous.hash() {
                return Err(ChainViolation::BrokenLink {
                    index: block.index(),
                    expected: previous.hash().to_string(),
                    found: block.previous_hash().to_string(),
                });
            }
        }
    }

    debug!(blocks = blocks.len(), "chain verified");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
impl<S: BlockStore> Ledger<S> {
    /// Swap a block in memory without touching the store.
    fn replace_block(&self, position: usize, block: Block) {
        self.chain.write().blocks[position] = block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestampRecovery;
    use crate::storage::block::RecordTimestamp;
    use crate::storage::store::MemoryStore;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn strict() -> LedgerConfig {
        LedgerConfig::default()
    }

    fn ledger_with(store: Arc<MemoryStore>) -> Ledger<Arc<MemoryStore>> {
        Ledger::open(store, strict())
    }

    /// Rebuild block `position` with edited data but its original hash.
    fn tamper_data(ledger: &Ledger<impl BlockStore>, position: usize, data: Value) {
        let mut record = ledger.blocks()[position].to_record();
        record.data = data;
        let forged = Block::from_record(record, TimestampRecovery::Reject).unwrap();
        ledger.replace_block(position, forged);
    }

    // -- Loading ------------------------------------------------------------

    #[test]
    fn fresh_ledger_bootstraps_genesis() {
        let store = Arc::new(MemoryStore::new());
        let ledger = ledger_with(Arc::clone(&store));

        assert_eq!(ledger.len(), 1);
        let genesis = ledger.latest();
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.previous_hash(), "0");
        assert!(ledger.validate_chain());
        assert_eq!(ledger.load_outcome(), Some(LoadOutcome::Bootstrapped));
        assert_eq!(store.len(), 1, "genesis must be persisted");
    }

    #[test]
    fn ledger_loads_lazily_on_first_access() {
        let ledger = Ledger::new(MemoryStore::new(), strict());
        assert_eq!(ledger.state(), LedgerState::Uninitialized);

        let latest = ledger.latest();
        assert!(latest.is_genesis());
        assert_eq!(ledger.state(), LedgerState::Loaded { degraded: false });
    }

    #[test]
    fn append_on_unloaded_ledger_loads_first() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(Arc::clone(&store), strict());

        let block = ledger.append(&json!({ "first": true })).unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(ledger.len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn restart_restores_the_same_chain() {
        let store = Arc::new(MemoryStore::new());
        let first = ledger_with(Arc::clone(&store));
        first.append_diagnostic_record(&json!({ "patient": "A" })).unwrap();
        first.append_diagnostic_record(&json!({ "patient": "B" })).unwrap();
        let before = first.blocks();
        drop(first);

        let second = ledger_with(store);
        assert_eq!(second.load_outcome(), Some(LoadOutcome::Restored { blocks: 3 }));
        assert_eq!(second.blocks(), before);
        assert!(second.validate_chain());
    }

    #[test]
    fn unreachable_store_degrades_to_memory_genesis() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let ledger = ledger_with(store);

        assert_eq!(ledger.len(), 1);
        assert!(ledger.latest().is_genesis());
        assert!(ledger.validate_chain());
        assert_eq!(ledger.state(), LedgerState::Loaded { degraded: true });
        match ledger.load_outcome() {
            Some(LoadOutcome::Degraded { reason }) => assert!(reason.contains("unreachable")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn undecodable_record_degrades_under_strict_timestamps() {
        let genesis = Block::genesis(10.0).unwrap();
        let mut record = genesis.to_record();
        record.timestamp = RecordTimestamp::Text("garbage".into());
        let ledger = Ledger::open(MemoryStore::with_records([record]), strict());

        assert!(ledger.load_outcome().unwrap().is_degraded());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn lenient_timestamps_load_but_fail_validation() {
        let genesis = Block::genesis(10.0).unwrap();
        let block1 = Block::next(&genesis, json!({ "n": 1 }), 11.0).unwrap();
        let mut record = block1.to_record();
        record.timestamp = RecordTimestamp::Text("garbage".into());

        let config = LedgerConfig {
            timestamp_recovery: TimestampRecovery::SubstituteNow,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::open(
            MemoryStore::with_records([genesis.to_record(), record]),
            config,
        );

        assert_eq!(ledger.load_outcome(), Some(LoadOutcome::Restored { blocks: 2 }));
        assert!(matches!(
            ledger.verify_chain(),
            Err(ChainViolation::HashMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn reload_picks_up_blocks_written_elsewhere() {
        let store = Arc::new(MemoryStore::new());
        let ledger = ledger_with(Arc::clone(&store));
        let extra = Block::next(&ledger.latest(), json!("external"), 99.0).unwrap();
        store.save(&extra.to_record()).unwrap();

        assert_eq!(ledger.len(), 1, "in-memory view is not refreshed implicitly");
        ledger.load();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.validate_chain());
    }

    // -- Appending ----------------------------------------------------------

    #[test]
    fn sequential_appends_grow_by_one_and_stay_valid() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        for n in 1..=10usize {
            let block = ledger.append(&json!({ "n": n })).unwrap();
            assert_eq!(ledger.len(), n + 1);
            assert_eq!(block.index(), n as u64);
            assert!(ledger.validate_chain(), "chain invalid after append {n}");
        }
        for (i, block) in ledger.blocks().iter().enumerate() {
            assert_eq!(block.index(), i as u64);
        }
    }

    #[test]
    fn diagnostic_scenario_a_then_b() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        assert_eq!(ledger.len(), 1);

        ledger.append_diagnostic_record(&json!({ "patient": "A" })).unwrap();
        let chain = ledger.blocks();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].index(), 1);
        assert_eq!(chain[1].previous_hash(), chain[0].hash());
        assert!(ledger.validate_chain());

        ledger.append_diagnostic_record(&json!({ "patient": "B" })).unwrap();
        let chain = ledger.blocks();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[2].previous_hash(), chain[1].hash());

        assert_eq!(
            ledger.records(),
            vec![json!({ "patient": "A" }), json!({ "patient": "B" })]
        );
    }

    #[test]
    fn records_skip_genesis_and_untagged_blocks() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        ledger.append(&json!({ "type": "login", "user": "x" })).unwrap();
        ledger.append_diagnostic_record(&json!({ "patient": "A" })).unwrap();
        ledger.append(&"plain text").unwrap();
        ledger.append_diagnostic_record(&json!({ "patient": "B" })).unwrap();

        assert_eq!(
            ledger.records(),
            vec![json!({ "patient": "A" }), json!({ "patient": "B" })]
        );
    }

    #[test]
    fn diagnostic_payload_is_enveloped() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        let block = ledger
            .append_diagnostic_record(&json!({ "patient": "A", "risk": 0.3 }))
            .unwrap();

        let data = block.data();
        assert_eq!(data["type"], "diagnostic_record");
        assert_eq!(data["record"], json!({ "patient": "A", "risk": 0.3 }));
        assert!(data["timestamp"].is_f64());
    }

    #[test]
    fn unserializable_payload_leaves_chain_untouched() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8, 2], "non-string key");

        let err = ledger.append(&bad).unwrap_err();
        assert!(matches!(err, LedgerError::Construction(_)));
        assert!(ledger.append_diagnostic_record(&bad).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn persist_failure_rejects_append_by_default() {
        let store = Arc::new(MemoryStore::new());
        let ledger = ledger_with(Arc::clone(&store));
        let tail = ledger.latest();
        store.set_offline(true);

        let err = ledger.append(&json!({ "n": 1 })).unwrap_err();
        assert!(matches!(err, LedgerError::PersistFailed { index: 1, .. }));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.latest(), tail);

        // Store comes back; the same index is free again.
        store.set_offline(false);
        let block = ledger.append(&json!({ "n": 1 })).unwrap();
        assert_eq!(block.index(), 1);
        assert!(ledger.validate_chain());
    }

    #[test]
    fn degraded_ledger_resyncs_before_appending() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let ledger = ledger_with(Arc::clone(&store));
        assert!(ledger.load_outcome().unwrap().is_degraded());

        store.set_offline(false);
        let block = ledger
            .append_diagnostic_record(&json!({ "patient": "A" }))
            .unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(ledger.state(), LedgerState::Loaded { degraded: false });
        assert_eq!(store.len(), 2, "genesis and block 1 are both durable");
        drop(ledger);

        let reopened = ledger_with(store);
        assert_eq!(reopened.load_outcome(), Some(LoadOutcome::Restored { blocks: 2 }));
        assert!(reopened.validate_chain());
        assert_eq!(reopened.records(), vec![json!({ "patient": "A" })]);
    }

    #[test]
    fn degraded_ledger_refuses_appends_while_store_is_down() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let ledger = ledger_with(Arc::clone(&store));

        let err = ledger.append(&json!({ "n": 1 })).unwrap_err();
        assert!(matches!(err, LedgerError::OutOfSync { .. }));
        assert_eq!(ledger.len(), 1);

        store.set_offline(false);
        assert!(store.is_empty());
    }

    #[test]
    fn stored_index_at_maximum_cannot_be_extended() {
        let genesis = Block::genesis(1.0).unwrap();
        let mut record = genesis.to_record();
        record.index = u64::MAX;
        let ledger = Ledger::open(MemoryStore::with_records([record]), strict());

        let err = ledger.append(&json!({ "n": 1 })).unwrap_err();
        assert!(matches!(err, LedgerError::Construction(_)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn persist_failure_appends_in_memory_when_degrading() {
        let store = Arc::new(MemoryStore::new());
        let config = LedgerConfig {
            persist_failure: PersistFailurePolicy::Degrade,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::open(Arc::clone(&store), config);
        store.set_offline(true);

        let block = ledger.append(&json!({ "n": 1 })).unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.validate_chain());

        store.set_offline(false);
        assert_eq!(store.len(), 1, "the block never reached the store");
    }

    #[test]
    fn concurrent_appends_never_share_an_index() {
        use std::thread;

        let ledger = Arc::new(Ledger::open(MemoryStore::new(), strict()));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for n in 0..25 {
                        ledger
                            .append_diagnostic_record(&json!({ "worker": worker, "n": n }))
                            .expect("append should succeed");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread should not panic");
        }

        assert_eq!(ledger.len(), 1 + 8 * 25);
        assert_eq!(ledger.store().len(), 1 + 8 * 25);
        assert_eq!(ledger.records().len(), 8 * 25);
        assert!(ledger.validate_chain());
    }

    // -- Validation ---------------------------------------------------------

    #[test]
    fn tampered_data_is_detected_at_every_position() {
        for k in 1..5 {
            let ledger = Ledger::open(MemoryStore::new(), strict());
            for n in 0..4 {
                ledger.append_diagnostic_record(&json!({ "n": n })).unwrap();
            }
            assert!(ledger.validate_chain());

            tamper_data(&ledger, k, json!({ "n": "forged" }));
            assert!(!ledger.validate_chain(), "tamper at {k} went unnoticed");
            assert!(!ledger.validate_chain(), "validation must stay false");
            assert!(matches!(
                ledger.verify_chain(),
                Err(ChainViolation::HashMismatch { index, .. }) if index == k as u64
            ));
        }
    }

    #[test]
    fn tampering_stays_detected_after_further_appends() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        ledger.append(&json!({ "n": 1 })).unwrap();
        ledger.append(&json!({ "n": 2 })).unwrap();
        tamper_data(&ledger, 1, json!({ "n": 100 }));

        ledger.append(&json!({ "n": 3 })).unwrap();
        assert!(!ledger.validate_chain());
    }

    #[test]
    fn rehashed_forgery_breaks_the_next_link() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        ledger.append(&json!({ "n": 1 })).unwrap();
        ledger.append(&json!({ "n": 2 })).unwrap();

        // A forger who recomputes block 1's hash still breaks block 2's link.
        let original = ledger.blocks()[1].clone();
        let forged = Block::new(
            1,
            original.timestamp(),
            json!({ "n": "forged" }),
            original.previous_hash(),
            0,
        )
        .unwrap();
        ledger.replace_block(1, forged);

        assert!(matches!(
            ledger.verify_chain(),
            Err(ChainViolation::BrokenLink { index: 2, .. })
        ));
    }

    #[test]
    fn genesis_with_wrong_sentinel_is_rejected() {
        let genesis = Block::new(0, 1.0, json!("Genesis"), "1", 0).unwrap();
        assert!(matches!(
            verify_blocks(&[genesis]),
            Err(ChainViolation::GenesisLink { .. })
        ));
    }

    #[test]
    fn gap_in_indices_is_rejected() {
        let b0 = Block::genesis(1.0).unwrap();
        let b1 = Block::next(&b0, json!(1), 2.0).unwrap();
        let b2 = Block::next(&b1, json!(2), 3.0).unwrap();
        let b3 = Block::next(&b2, json!(3), 4.0).unwrap();

        let ledger = Ledger::open(
            MemoryStore::with_records([b0.to_record(), b1.to_record(), b3.to_record()]),
            strict(),
        );
        assert_eq!(
            ledger.verify_chain(),
            Err(ChainViolation::IndexGap { position: 2, found: 3 })
        );
    }

    #[test]
    fn empty_sequence_verifies() {
        assert!(verify_blocks(&[]).is_ok());
    }

    #[test]
    fn block_lookup_by_index() {
        let ledger = Ledger::open(MemoryStore::new(), strict());
        ledger.append(&json!({ "n": 1 })).unwrap();

        assert_eq!(ledger.block(1).unwrap().index(), 1);
        assert!(ledger.block(2).is_none());
        assert!(ledger.block(u64::MAX).is_none());
    }
}
