//! # CLI Interface
//!
//! Command-line structure for `diabot-node`, built with `clap` derive.
//! Every flag has a `DIABOT_*` environment fallback.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use diabot_ledger::config::{LedgerConfig, PersistFailurePolicy, TimestampRecovery};

use crate::logging::LogFormat;

/// DiaBot audit ledger node.
///
/// Keeps the hash-chained audit trail of diagnostic results, serves it over
/// HTTP, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "diabot-node",
    about = "DiaBot audit ledger node",
    version,
    propagate_version = true
)]
pub struct DiabotNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger node and its HTTP API.
    Run(RunArgs),
    /// Load the on-disk chain, print an integrity report, and exit non-zero
    /// if the chain is invalid.
    Verify(VerifyArgs),
    /// Print version information and exit.
    Version,
}

/// Ledger settings shared by `run` and `verify`.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Directory holding the sled database.
    #[arg(long, short = 'd', env = "DIABOT_DATA_DIR", default_value = "./diabot-data")]
    pub data_dir: PathBuf,

    /// Keep an appended block in memory when it cannot be persisted,
    /// instead of rejecting the append.
    #[arg(long, env = "DIABOT_DEGRADE_ON_PERSIST_FAILURE")]
    pub degrade_on_persist_failure: bool,

    /// Replace unparseable stored timestamps with the current time instead
    /// of refusing to load the chain.
    #[arg(long, env = "DIABOT_SUBSTITUTE_BAD_TIMESTAMPS")]
    pub substitute_bad_timestamps: bool,

    /// Log output format.
    #[arg(long, env = "DIABOT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl LedgerArgs {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            persist_failure: if self.degrade_on_persist_failure {
                PersistFailurePolicy::Degrade
            } else {
                PersistFailurePolicy::Reject
            },
            timestamp_recovery: if self.substitute_bad_timestamps {
                TimestampRecovery::SubstituteNow
            } else {
                TimestampRecovery::Reject
            },
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Address the HTTP listeners bind to.
    #[arg(long, env = "DIABOT_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the ledger HTTP API.
    #[arg(long, env = "DIABOT_API_PORT", default_value_t = 8640)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "DIABOT_METRICS_PORT", default_value_t = 8641)]
    pub metrics_port: u16,

    /// Keep the chain in memory only. Nothing survives a restart.
    #[arg(long, env = "DIABOT_EPHEMERAL")]
    pub ephemeral: bool,
}

/// Arguments for the `verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        DiabotNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults_are_strict() {
        let cli = DiabotNodeCli::try_parse_from(["diabot-node", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(!args.ephemeral);
        assert_eq!(args.ledger.ledger_config(), LedgerConfig::default());
    }

    #[test]
    fn lenient_flags_map_to_lenient_config() {
        let cli = DiabotNodeCli::try_parse_from([
            "diabot-node",
            "verify",
            "--degrade-on-persist-failure",
            "--substitute-bad-timestamps",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.ledger.ledger_config(), LedgerConfig::lenient());
        assert_eq!(args.ledger.log_format, LogFormat::Json);
    }
}
