//! Forneria CLI - Command-line cashier register.
//!
//! # Usage
//!
//! ```bash
//! # Search the catalog by name
//! pos-cli search --catalog productos.json marraqueta
//!
//! # Replay a register session and print the sale request it would send
//! pos-cli run --catalog productos.json venta.txt
//!
//! # Replay a session and submit the sale to POS_SALE_URL
//! pos-cli run --catalog productos.json venta.txt --submit
//! ```
//!
//! # Commands
//!
//! - `search` - List catalog products whose name matches a query
//! - `run` - Apply a script of register commands (see [`commands::run`])

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pos-cli")]
#[command(author, version, about = "Forneria cashier register")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the product catalog by name
    Search {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Case-insensitive name fragment (empty lists everything)
        #[arg(default_value = "")]
        query: String,
    },
    /// Run a register session script
    Run {
        /// Catalog JSON file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Script with one register command per line
        script: PathBuf,

        /// Send `submit` commands to the sales backend instead of printing the request
        #[arg(long)]
        submit: bool,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "forneria_pos=info,pos_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Search { catalog, query } => commands::search::run(&catalog, &query)?,
        Commands::Run {
            catalog,
            script,
            submit,
        } => commands::run::run(&catalog, &script, submit).await?,
    }
    Ok(())
}
