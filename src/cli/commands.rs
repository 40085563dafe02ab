//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{mask_url, Config, SamplingConfig};
use crate::programs::{validate_address, ProgramRegistry};
use crate::report::ReportFormatter;
use crate::rpc::RpcTransactionSource;
use crate::transaction::TransactionAnalyzer;
use crate::wallet::{WalletAnalyzer, WalletStatsAggregator};

/// Wire the RPC source, registry and analyzers from configuration
pub fn build_analyzer(config: &Config) -> Result<WalletAnalyzer<RpcTransactionSource>> {
    let registry = Arc::new(
        ProgramRegistry::from_config(&config.programs).context("Invalid [programs] table")?,
    );
    let source = Arc::new(
        RpcTransactionSource::new(&config.rpc).context("Failed to create RPC client")?,
    );

    Ok(WalletAnalyzer::new(
        source,
        TransactionAnalyzer::new(registry),
        WalletStatsAggregator::new(config.bot.clone()),
    )
    .with_sampling(config.sampling))
}

/// Apply command-line sampling overrides and re-validate
pub fn with_sampling_overrides(
    config: &Config,
    sample_size: Option<usize>,
    signature_limit: Option<usize>,
) -> Result<Config> {
    let mut config = config.clone();
    config.sampling = SamplingConfig {
        signature_limit: signature_limit.unwrap_or(config.sampling.signature_limit),
        sample_size: sample_size.unwrap_or(config.sampling.sample_size),
    };
    config.validate()?;
    Ok(config)
}

/// Analyze a wallet and print its statistics
pub async fn wallet(
    config: &Config,
    address: &str,
    sample_size: Option<usize>,
    signature_limit: Option<usize>,
    json: bool,
) -> Result<()> {
    validate_address(address)?;
    let config = with_sampling_overrides(config, sample_size, signature_limit)?;

    info!(
        "Analyzing wallet {} (signature_limit={}, sample_size={})",
        address, config.sampling.signature_limit, config.sampling.sample_size
    );

    let analyzer = build_analyzer(&config)?;
    let analysis = analyzer
        .analyze_wallet(address)
        .await
        .with_context(|| format!("Failed to analyze wallet {}", address))?;

    let placeholders = analysis
        .sample
        .iter()
        .filter(|r| !r.succeeded && r.instructions.is_empty())
        .count();
    if placeholders > 0 {
        warn!(
            "{} of {} sampled transactions could not be fetched",
            placeholders,
            analysis.sample.len()
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", ReportFormatter::wallet_stats(&analysis.stats));
        println!("{}", ReportFormatter::transactions(&analysis.sample));
    }

    Ok(())
}

/// Analyze a single transaction
pub async fn tx(config: &Config, signature: &str, json: bool) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    let analysis = analyzer
        .analyze_transaction(signature)
        .await
        .with_context(|| format!("Failed to fetch transaction {}", signature))?
        .ok_or_else(|| anyhow::anyhow!("Transaction not found: {}", signature))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", ReportFormatter::transaction(&analysis));
    }

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config, json: bool) -> Result<()> {
    if json {
        let mut masked = config.clone();
        masked.rpc.endpoint = mask_url(&config.rpc.endpoint);
        println!("{}", serde_json::to_string_pretty(&masked)?);
    } else {
        println!("{}", config.masked_display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_overrides() {
        let config = Config::default();

        let overridden = with_sampling_overrides(&config, Some(5), None).unwrap();
        assert_eq!(overridden.sampling.sample_size, 5);
        assert_eq!(overridden.sampling.signature_limit, 100);

        let overridden = with_sampling_overrides(&config, None, Some(40)).unwrap();
        assert_eq!(overridden.sampling.signature_limit, 40);
        assert_eq!(overridden.sampling.sample_size, 20);
    }

    #[test]
    fn test_sampling_overrides_rejected() {
        let config = Config::default();
        assert!(with_sampling_overrides(&config, Some(0), None).is_err());
        assert!(with_sampling_overrides(&config, Some(50), Some(10)).is_err());
    }

    #[test]
    fn test_build_analyzer() {
        let config = with_sampling_overrides(&Config::default(), Some(7), Some(70)).unwrap();
        let analyzer = build_analyzer(&config).unwrap();
        assert_eq!(analyzer.sampling().sample_size, 7);
        assert_eq!(analyzer.sampling().signature_limit, 70);
    }
}
