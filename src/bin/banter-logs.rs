//! Inspect and initialize the exchange log database.
//!
//! # Usage
//!
//! ```bash
//! # Create the database (subsequent prompts will be logged to it)
//! banter-logs --init
//!
//! # Show the three most recent exchanges
//! banter-logs
//!
//! # Show everything, with long strings truncated
//! banter-logs --count 0 --truncate
//!
//! # Print the resolved database path
//! banter-logs --location
//! ```

use std::path::PathBuf;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use banter::{Config, Exchange, LogStore, utils};

/// Field width for truncated display.
const TRUNCATE_LENGTH: usize = 100;

/// Command-line arguments for the banter-logs tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// Number of entries to show.
    #[arrrg(optional, "Number of entries to show - 0 for all (default: 3)", "COUNT")]
    count: Option<usize>,

    /// Database path override.
    #[arrrg(optional, "Path to the log database", "PATH")]
    path: Option<String>,

    /// Truncate long strings in output.
    #[arrrg(flag, "Truncate long strings in output")]
    truncate: bool,

    /// Create the database if it does not exist.
    #[arrrg(flag, "Create the log database and exit")]
    init: bool,

    /// Print the resolved database path and exit.
    #[arrrg(flag, "Print the resolved database path and exit")]
    location: bool,
}

fn main() {
    let (args, _) = Args::from_command_line_relaxed("banter-logs [OPTIONS]");
    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> banter::Result<()> {
    let config = Config::from_env();
    let path = args.path.map(PathBuf::from).unwrap_or(config.log_path);

    if args.location {
        println!("{}", path.display());
        return Ok(());
    }

    if args.init {
        LogStore::initialize(&path)?;
        return Ok(());
    }

    // Inspection is a hard error against a missing database, unlike the
    // best-effort recording path.
    let store = LogStore::open(&path)?;
    let mut exchanges = store.recent(args.count.unwrap_or(3))?;
    if args.truncate {
        for exchange in &mut exchanges {
            truncate_exchange(exchange);
        }
    }
    println!("{}", serde_json::to_string_pretty(&exchanges)?);
    Ok(())
}

fn truncate_exchange(exchange: &mut Exchange) {
    exchange.prompt = utils::truncate_string(&exchange.prompt, TRUNCATE_LENGTH);
    exchange.response = utils::truncate_string(&exchange.response, TRUNCATE_LENGTH);
}
