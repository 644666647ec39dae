//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use rotor_core::Fixed;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "rotor",
    version,
    about = "Quadrature encoder tachometer and motor driver loop"
)]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/rotor.toml")]
    pub config: PathBuf,

    /// Log and print snapshots as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides RUST_LOG and the config
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the measurement loop until Ctrl-C, `quit`, or --ticks snapshots
    Run {
        /// Initial set-point, as shown by `set-points`
        #[arg(long, value_name = "VALUE", allow_hyphen_values = true)]
        set_point: Option<Fixed>,
        /// Stop after this many snapshots
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Append every snapshot to a CSV file
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
    },
    /// Print the set-point table (display value -> driver register)
    SetPoints,
    /// Open the motor driver, read its fault register, and report
    SelfCheck,
}
