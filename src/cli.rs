use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_COLLECTION, DEFAULT_DATABASE};
use crate::store::DEFAULT_BATCH_SIZE;

/// Power queried when `--power` is not given
pub const DEFAULT_POWER: &str = "Pranav Antal";

/// States that count as held territory
pub const DEFAULT_STATES: [&str; 3] = ["Exploited", "Fortified", "Stronghold"];

#[derive(Parser, Debug)]
#[command(name = "powerplay-extract")]
#[command(version, about = "Extract Powerplay-controlled star systems from a galaxy document store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Location of the document store
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Store directory (defaults to the platform data directory)
    #[arg(long, env = "POWERPLAY_ENDPOINT")]
    pub endpoint: Option<PathBuf>,

    /// Database name
    #[arg(long, env = "POWERPLAY_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Collection name
    #[arg(long, env = "POWERPLAY_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List systems controlled by a power
    Query {
        #[command(flatten)]
        store: StoreArgs,

        /// Controlling power
        #[arg(short, long, default_value = DEFAULT_POWER)]
        power: String,

        /// Accepted power states (comma-separated, repeatable)
        #[arg(short, long = "state", value_delimiter = ',', default_values_t = DEFAULT_STATES.map(String::from))]
        states: Vec<String>,

        /// Decode worker threads
        #[arg(short, long, default_value_t = 1)]
        workers: usize,

        /// Documents per cursor batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Cancel the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print what was decoded before a cursor failure or timeout
        #[arg(long)]
        best_effort: bool,

        /// Print one JSON document per system
        #[arg(long)]
        json: bool,
    },

    /// Import a mongoexport JSONL file into the store
    Import {
        /// JSONL file, one document per line
        input: PathBuf,

        #[command(flatten)]
        store: StoreArgs,

        /// Drop the collection before importing
        #[arg(short, long)]
        replace: bool,
    },

    /// List fields usable in filters
    Fields,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
