//! Asset-Ledger CLI Application
//!
//! A command-line interface for mining, replaying and gossiping ledger events.

use asset_ledger::cli;
use asset_ledger::config::LedgerConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A proof-of-work asset ledger with gossip", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the mining difficulty (leading zero hex digits)
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Start chains without an explicit genesis block
    #[arg(long)]
    no_genesis: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a create/transfer scenario and gossip the result
    Demo {
        /// Print blocks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a key pair
    Keygen {
        /// Write private.pem and public.pem to this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Mine a block from transaction lines
    Mine {
        /// Transaction lines, e.g. "[CREATE] ASSET1 GENESIS -> Alice"
        #[arg(required = true)]
        transactions: Vec<String>,

        /// Sign every transaction with this PEM private key
        #[arg(short, long)]
        key: Option<PathBuf>,

        /// Print the mined block as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild and validate a chain from an exported JSON file
    Replay {
        /// Input file: a JSON array of blocks, each an array of lines
        #[arg(short, long)]
        input: PathBuf,

        /// Print blocks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Flood transaction ids around a ring of simulated nodes
    Gossip {
        /// Number of nodes
        #[arg(short, long, default_value = "5")]
        nodes: usize,

        /// Node indices to take offline
        #[arg(long, value_delimiter = ',')]
        offline: Vec<usize>,

        /// Transaction ids to send to node 0
        #[arg(required = true)]
        tx_ids: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(difficulty) = cli.difficulty {
        config.chain.difficulty = difficulty;
    }
    if cli.no_genesis {
        config.chain.include_genesis_block = false;
    }
    config.validate()?;

    match cli.command {
        Commands::Demo { json } => {
            cli::cmd_demo(&config, json)?;
        }

        Commands::Keygen { out } => {
            cli::cmd_keygen(out.as_deref())?;
        }

        Commands::Mine {
            transactions,
            key,
            json,
        } => {
            cli::cmd_mine(&config, &transactions, key.as_deref(), json)?;
        }

        Commands::Replay { input, json } => {
            cli::cmd_replay(&config, &input, json)?;
        }

        Commands::Gossip {
            nodes,
            offline,
            tx_ids,
        } => {
            cli::cmd_gossip(&config, nodes, &tx_ids, &offline)?;
        }
    }

    Ok(())
}
