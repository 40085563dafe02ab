//! Solana Wallet Analyzer Library
//!
//! Normalizes and classifies wallet transactions, computes balance deltas and
//! scores wallets for bot-like behavior.
//!
//! The analysis core (`instruction`, `classify`, `balance`, `wallet`) is pure
//! and synchronous apart from the injected [`wallet::TransactionSource`];
//! `rpc` provides the JSON-RPC implementation of that source.

pub mod balance;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod instruction;
pub mod programs;
pub mod report;
pub mod rpc;
pub mod transaction;
pub mod wallet;

// Re-export commonly used types
pub use balance::{BalanceDeltaCalculator, BalanceSnapshot, TokenDelta};
pub use classify::{TransactionCategory, TransactionClassifier};
pub use config::Config;
pub use error::{Error, Result};
pub use instruction::{InstructionNormalizer, InstructionRecord};
pub use programs::ProgramRegistry;
pub use report::ReportFormatter;
pub use transaction::{TokenTransfer, TransactionAnalysis, TransactionAnalyzer, TransactionRecord};
pub use wallet::{WalletAnalyzer, WalletStats, WalletStatsAggregator};
