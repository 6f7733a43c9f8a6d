// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # DiaBot Ledger Node
//!
//! Entry point for the `diabot-node` binary. Parses CLI arguments,
//! initializes logging and metrics, loads the ledger, and serves the HTTP
//! API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the node
//! - `verify`  — check the on-disk chain offline and print a report
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use diabot_ledger::config::LEDGER_VERSION;
use diabot_ledger::storage::{BlockStore, Ledger, LedgerDB, LoadOutcome, MemoryStore};

use cli::{Commands, DiabotNodeCli};
use metrics::LedgerMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DiabotNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Verify(args) => verify_chain(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Sled database location inside the data directory.
fn db_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("ledger")
}

/// Starts the node: loads the ledger, then serves the API and metrics
/// endpoints until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.ledger.log_format);

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.ledger.data_dir.display(),
        ephemeral = args.ephemeral,
        "starting diabot-node"
    );

    // --- Storage ---
    let store: Box<dyn BlockStore> = if args.ephemeral {
        tracing::warn!("ephemeral mode, the chain will not survive a restart");
        Box::new(MemoryStore::new())
    } else {
        let path = db_path(&args.ledger.data_dir);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create database directory: {}", path.display()))?;
        let db = LedgerDB::open(&path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        tracing::info!(path = %path.display(), "database opened");
        Box::new(db)
    };

    // --- Ledger ---
    let config = args.ledger.ledger_config();
    let ledger = Arc::new(Ledger::open(store, config));
    match ledger.load_outcome() {
        Some(LoadOutcome::Degraded { reason }) => {
            tracing::error!(%reason, "ledger running degraded on an in-memory genesis block");
        }
        Some(outcome) => tracing::info!(?outcome, blocks = ledger.len(), "ledger loaded"),
        None => {}
    }

    // --- Metrics ---
    let node_metrics = Arc::new(LedgerMetrics::new());
    node_metrics.chain_length.set(ledger.len() as i64);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (ledger {})", env!("CARGO_PKG_VERSION"), LEDGER_VERSION),
        ledger,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("diabot-node stopped");
    Ok(())
}

/// Loads the on-disk chain without serving anything, prints an integrity
/// report, and fails when the chain is invalid or cannot be read.
fn verify_chain(args: cli::VerifyArgs) -> Result<()> {
    logging::init_logging("diabot_ledger=warn", args.ledger.log_format);

    let path = db_path(&args.ledger.data_dir);
    if !path.exists() {
        bail!("no ledger database at {}", path.display());
    }
    let db = LedgerDB::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    if db.block_count() == 0 {
        println!("ledger at {} is empty", path.display());
        return Ok(());
    }

    let ledger = Ledger::new(db, args.ledger.ledger_config());
    if let LoadOutcome::Degraded { reason } = ledger.load() {
        bail!("stored chain could not be loaded: {reason}");
    }

    let report = api::ValidationReport::new(ledger.len(), ledger.verify_chain());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("blocks : {}", report.length);
        println!("valid  : {}", report.valid);
        if let Some(message) = &report.message {
            println!("problem: {message}");
        }
    }

    if !report.valid {
        bail!("chain integrity check failed");
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("diabot-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger      {}", LEDGER_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
