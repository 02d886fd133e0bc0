//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// attsync - Attendance device synchronization engine
#[derive(Parser, Debug)]
#[command(
    name = "attsync",
    author,
    version,
    about = "Attendance device synchronization engine",
    long_about = "Polls biometric and punch-clock devices, deduplicates raw punch events\n\
                  and folds them into a per-employee, per-day attendance ledger under a\n\
                  configurable grace-period policy."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ATTSYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ATTSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduled sync service
    Run(RunArgs),

    /// Run one sync cycle over all active devices and exit
    Sync(SyncArgs),

    /// Force one device's sync
    SyncDevice(DeviceArgs),

    /// Connect/disconnect round trip against one device
    TestDevice(DeviceArgs),

    /// Validate a plan file without running
    Validate(ValidateArgs),

    /// Display plan information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the plan file (TOML or JSON)
    #[arg(short, long, default_value = "attsync.toml", env = "ATTSYNC_CONFIG")]
    pub config: PathBuf,

    /// Override the cycle interval from the plan, in seconds (0 = keep plan value)
    #[arg(long, default_value = "0", env = "ATTSYNC_CYCLE_INTERVAL")]
    pub interval: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9300", env = "ATTSYNC_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate the plan and exit without starting the service
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `sync` command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Path to the plan file (TOML or JSON)
    #[arg(short, long, default_value = "attsync.toml", env = "ATTSYNC_CONFIG")]
    pub config: PathBuf,

    /// Output the cycle report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `sync-device` and `test-device`
#[derive(Parser, Debug)]
pub struct DeviceArgs {
    /// Path to the plan file (TOML or JSON)
    #[arg(short, long, default_value = "attsync.toml", env = "ATTSYNC_CONFIG")]
    pub config: PathBuf,

    /// Device id from the registry
    pub device_id: String,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the plan file to validate
    #[arg(short, long, default_value = "attsync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the plan file
    #[arg(short, long, default_value = "attsync.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-device details
    #[arg(long)]
    pub devices: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
