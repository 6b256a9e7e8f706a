//! Command line arguments.

use cardgate_core::constants::{
    DEFAULT_BASE_DELAY_MS, DEFAULT_MARKER_BLOCK, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SECTOR_TRAILER_BLOCK,
};
use cardgate_core::{CanonicalUid, OperatingMode, RetryPolicy};
use cardgate_hardware::MifareKey;
use cardgate_storage::DEFAULT_DATABASE_PATH;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Seconds each simulated tag stays in the field.
const DEFAULT_DWELL_SECS: u64 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "cardgate",
    version,
    about = "RFID access control and tag enrollment",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Log filter (overridden by RUST_LOG), e.g. "info" or "cardgate_engine=debug".
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments of `run` when no subcommand is given.
    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// The selected subcommand, `run` by default.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Run(self.run))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gate: check or enroll presented tags, switch modes from stdin.
    Run(RunArgs),

    /// Re-key one sector trailer of the next presented tag.
    ProvisionKey(ProvisionArgs),

    /// Write up to 16 bytes of text to a data block of the next presented tag.
    WriteText(WriteTextArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Sqlite,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StartMode {
    Read,
    Enroll,
}

impl From<StartMode> for OperatingMode {
    fn from(mode: StartMode) -> Self {
        match mode {
            StartMode::Read => OperatingMode::ReadCheck,
            StartMode::Enroll => OperatingMode::Enroll,
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct RetryArgs {
    /// Retries after the first attempt of each hardware operation.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Backoff before the first retry; doubles on each further retry.
    #[arg(long, default_value_t = DEFAULT_BASE_DELAY_MS)]
    pub base_delay_ms: u64,
}

impl RetryArgs {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Registry backend.
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    pub backend: Backend,

    /// SQLite database file.
    #[arg(long, default_value = DEFAULT_DATABASE_PATH)]
    pub database: String,

    #[command(flatten)]
    pub retry: RetryArgs,

    /// Pause between scan cycles.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Forget the last seen tag after the field has been empty this long.
    #[arg(long)]
    pub absence_reset_ms: Option<u64>,

    /// Key used to authenticate the marker block (12 hex digits).
    #[arg(long)]
    pub auth_key: Option<MifareKey>,

    /// Mode at startup.
    #[arg(long, value_enum, default_value_t = StartMode::Read)]
    pub start_mode: StartMode,

    /// Tag to present to the simulated reader, e.g. 4-171-205-239. Repeatable.
    #[arg(long = "present", value_name = "UID")]
    pub present: Vec<CanonicalUid>,

    /// Seconds each simulated tag stays in the field.
    #[arg(long, default_value_t = DEFAULT_DWELL_SECS)]
    pub dwell_secs: u64,

    /// Print each scan event as a JSON line on stdout.
    #[arg(long)]
    pub events_json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ProvisionArgs {
    /// Current key of the sector.
    #[arg(long)]
    pub key: Option<MifareKey>,

    /// Key A to write.
    #[arg(long)]
    pub new_key: MifareKey,

    /// Key B to write (defaults to the new key A).
    #[arg(long)]
    pub key_b: Option<MifareKey>,

    /// Sector trailer block to rewrite.
    #[arg(long, default_value_t = DEFAULT_SECTOR_TRAILER_BLOCK)]
    pub trailer_block: u8,

    /// Tag placed in the simulated field.
    #[arg(long, value_name = "UID")]
    pub uid: CanonicalUid,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[derive(Args, Debug, Clone)]
pub struct WriteTextArgs {
    /// Text to write; longer than 16 bytes is truncated.
    pub text: String,

    /// Key of the block's sector.
    #[arg(long)]
    pub key: Option<MifareKey>,

    /// Data block to write.
    #[arg(long, default_value_t = DEFAULT_MARKER_BLOCK)]
    pub block: u8,

    /// Tag placed in the simulated field.
    #[arg(long, value_name = "UID")]
    pub uid: CanonicalUid,

    #[command(flatten)]
    pub retry: RetryArgs,
}
