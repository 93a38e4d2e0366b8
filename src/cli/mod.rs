pub mod console;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qubic_exchange")]
#[command(about = "Simulated exchange over a ledger network session", long_about = None)]
pub struct Cli {
    /// Path to the TOML config (created with defaults if missing)
    #[arg(long, global = true, default_value = "exchange.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect, provision demo accounts and open the console
    Run,
    /// Print a freshly generated wallet seed
    Seed {
        #[arg(long)]
        length: Option<usize>,
    },
    /// Print the public id derived from a seed
    Identity {
        #[arg(long)]
        seed: String,
    },
}
