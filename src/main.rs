//! Wallet Analyzer - classify Solana wallet activity and score bot likelihood
//!
//! # NOTE
//! - Category counts come from a small sample and are estimates.
//! - The bot score is a heuristic, not proof of automation.
//! - The deep success count pages through the full history; on busy wallets
//!   this is many RPC calls. Use a private RPC endpoint.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

// Use the library crate
use wallet_analyzer::cli::commands;
use wallet_analyzer::config::Config;

/// Wallet Analyzer - transaction classification and bot detection
#[derive(Parser)]
#[command(name = "wallet-analyzer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// RPC endpoint (overrides config)
    #[arg(long, env = "SOLANA_RPC_URL")]
    rpc_url: Option<String>,

    /// JSON output and JSON logs
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a wallet: activity mix, success rate, bot likelihood
    Wallet {
        /// Wallet address (base58)
        address: String,

        /// Number of transactions to classify
        #[arg(long)]
        sample_size: Option<usize>,

        /// Number of recent signatures to fetch
        #[arg(long)]
        signature_limit: Option<usize>,
    },

    /// Analyze a single transaction
    Tx {
        /// Transaction signature (base58)
        signature: String,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing (stderr, so stdout stays clean for reports)
    let filter = EnvFilter::from_default_env().add_directive("wallet_analyzer=info".parse()?);
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.rpc_url {
        config.rpc.endpoint = url;
    }

    // Execute command
    let result = match cli.command {
        Commands::Wallet {
            address,
            sample_size,
            signature_limit,
        } => commands::wallet(&config, &address, sample_size, signature_limit, cli.json).await,
        Commands::Tx { signature } => commands::tx(&config, &signature, cli.json).await,
        Commands::Config => commands::show_config(&config, cli.json),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
