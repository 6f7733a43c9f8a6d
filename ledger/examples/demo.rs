//! Terminal walkthrough of the audit ledger.
//!
//! Opens a temporary sled database, records a few diagnoses, shows the
//! chain, then edits one block behind the ledger's back and shows
//! validation catching it.
//!
//! Run with:
//!   cargo run --example demo

use serde_json::json;

use diabot_ledger::config::LedgerConfig;
use diabot_ledger::storage::{Block, BlockStore, Ledger, LedgerDB, MemoryStore};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

fn section(title: &str) {
    println!();
    println!("{BOLD}{CYAN}== {title} =={RESET}");
}

/// At most the first 12 characters, for display.
fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

fn print_block(block: &Block) {
    println!(
        "  {BOLD}#{}{RESET} {DIM}prev={}…{RESET} hash={}…",
        block.index(),
        short(block.previous_hash()),
        short(block.hash()),
    );
    println!("     {DIM}{}{RESET}", block.data());
}

fn verdict(valid: bool) -> String {
    if valid {
        format!("{GREEN}{BOLD}VALID{RESET}")
    } else {
        format!("{RED}{BOLD}TAMPERED{RESET}")
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    section("Opening a fresh ledger");
    let db = LedgerDB::open_temporary()?;
    let ledger = Ledger::open(db, LedgerConfig::default());
    print_block(&ledger.latest());

    section("Recording diagnoses");
    let diagnoses = [
        json!({ "result_id": "r-001", "user": "alice", "risk_level": "Low Risk", "probability": 0.12 }),
        json!({ "result_id": "r-002", "user": "bob", "risk_level": "High Risk", "probability": 0.87 }),
        json!({ "result_id": "r-003", "user": "carol", "risk_level": "Low Risk", "probability": 0.31 }),
    ];
    for record in &diagnoses {
        let block = ledger.append_diagnostic_record(record)?;
        print_block(&block);
    }
    println!("  chain: {}", verdict(ledger.validate_chain()));

    section("Editing block #2 in storage");
    let mut records = ledger.store().load_ordered()?;
    records[2].data["record"]["risk_level"] = json!("Low Risk");
    let forged = Ledger::open(MemoryStore::with_records(records), LedgerConfig::default());
    print_block(&forged.blocks()[2]);

    match forged.verify_chain() {
        Ok(()) => println!("  chain: {}", verdict(true)),
        Err(violation) => {
            println!("  chain: {}", verdict(false));
            println!("  {DIM}{violation}{RESET}");
        }
    }

    Ok(())
}
