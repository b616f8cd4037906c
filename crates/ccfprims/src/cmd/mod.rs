use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pack random MAC packets, reorder the segments, unpack and verify.
    Simulate(SimulateArgs),
    /// Decode a CCF segment header from hex.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Simulate(args) => simulate::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of MAC packets to generate.
    #[arg(long, default_value = "100")]
    pub packets: usize,
    /// Largest MAC content size in bytes.
    #[arg(long, default_value = "1500")]
    pub max_size: usize,
    /// Size of every grant in bytes, CCF header included.
    #[arg(long, default_value = "256")]
    pub grant_size: usize,
    /// Piggyback multiplier for both ends. Overrides --config.
    #[arg(long)]
    pub multiplier: Option<usize>,
    /// Piggyback bytes requested with the first grant.
    #[arg(long, default_value = "0")]
    pub piggyback: usize,
    /// Seed for packet contents and segment ordering.
    #[arg(long, default_value = "1", env = "CCFPRIMS_SEED")]
    pub seed: u64,
    /// Deliver segments in the order they were emitted.
    #[arg(long)]
    pub no_shuffle: bool,
    /// Largest run of segments shuffled together.
    #[arg(long, default_value = "1024")]
    pub reorder_depth: usize,
    /// JSON file with `packer` and `unpacker` settings.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Segment bytes as hex; whitespace, `:` and a leading `0x` are ignored.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}
