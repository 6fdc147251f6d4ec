//! Murmur CLI: inspect and drive a persona's reply memory from the terminal.
//!
//! Every command prints JSON to stdout; logs go to stderr.

mod cli;
mod cmd;
mod config;

use crate::cli::{Cli, Commands};
use crate::cmd::Session;
use clap::Parser;
use murmur_types::error::{MurmurError, MurmurResult};

fn init_tracing_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing_stderr();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> MurmurResult<()> {
    let output = match cli.command {
        // Pure function of the text; no database needed.
        Commands::Classify { text } => cmd::memory::classify(&text),
        command => {
            let config = config::load_config(cli.config.as_deref());
            let session = Session::open(config, &cli.actor)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cmd::execute(&session, command))?
        }
    };

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| MurmurError::Serialization(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
