pub mod license;
pub mod search;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use scli_common::serial::BaseSerial;

#[derive(Parser)]
#[command(name = "scli")]
#[command(about = "Retrieve BMC credentials and license keys for production systems.")]
#[command(version)]
pub struct CommandLine {
    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Scheduler endpoint, overrides the configuration
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Increase console verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve MAC, BMC password and license key for every system of an order
    #[command(alias = "l")]
    License(LicenseArgs),
    /// Find the system that contains the given component serials
    #[command(alias = "s")]
    Search {
        #[arg(required = true, value_name = "SERIAL")]
        serials: Vec<String>,
    },
}

#[derive(Args)]
pub struct LicenseArgs {
    /// Any serial of the order, e.g. 1098591 or 1098591-03
    pub serial: BaseSerial,

    /// Discover every system of the order (default)
    #[arg(short, long, conflicts_with = "range")]
    pub all: bool,

    /// Only process units START through END, inclusive
    #[arg(short, long, num_args = 2, value_names = ["START", "END"])]
    pub range: Option<Vec<u32>>,

    /// Report one row per node of multi-node chassis
    #[arg(long)]
    pub multi_node: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
