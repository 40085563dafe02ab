//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::programs::is_valid_address;

pub use crate::wallet::bot::BotThresholds;

/// Maximum page size accepted by `getSignaturesForAddress`
pub const MAX_SIGNATURE_PAGE_SIZE: usize = 1000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub bot: BotThresholds,
    #[serde(default)]
    pub programs: ProgramsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Page size of the deep success-count scan
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            page_size: default_page_size(),
        }
    }
}

/// Shallow sampling sizes for wallet analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Recent signatures fetched per wallet
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,
    /// Error-free transactions fully classified per wallet
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            signature_limit: default_signature_limit(),
            sample_size: default_sample_size(),
        }
    }
}

/// Extra program identifiers appended to the built-in tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramsConfig {
    #[serde(default)]
    pub dex: Vec<ProgramEntry>,
    #[serde(default)]
    pub nft: Vec<ProgramEntry>,
    #[serde(default)]
    pub bonding_curve: Vec<ProgramEntry>,
    #[serde(default)]
    pub memo: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub name: String,
    pub program_id: String,
}

fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_page_size() -> usize {
    MAX_SIGNATURE_PAGE_SIZE
}

fn default_signature_limit() -> usize {
    100
}

fn default_sample_size() -> usize {
    20
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            .set_default("rpc.max_retries", default_max_retries() as i64)?
            .set_default("sampling.signature_limit", default_signature_limit() as i64)?
            .set_default("sampling.sample_size", default_sample_size() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (ANALYZER__RPC__ENDPOINT, ...)
            .add_source(
                config::Environment::with_prefix("ANALYZER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let sampling = &self.sampling;
        if sampling.signature_limit == 0 {
            anyhow::bail!("signature_limit must be positive");
        }
        if sampling.sample_size == 0 {
            anyhow::bail!("sample_size must be positive");
        }
        if sampling.sample_size > sampling.signature_limit {
            anyhow::bail!(
                "sample_size ({}) cannot exceed signature_limit ({})",
                sampling.sample_size,
                sampling.signature_limit
            );
        }

        if self.rpc.page_size == 0 || self.rpc.page_size > MAX_SIGNATURE_PAGE_SIZE {
            anyhow::bail!(
                "page_size must be between 1 and {}, got {}",
                MAX_SIGNATURE_PAGE_SIZE,
                self.rpc.page_size
            );
        }

        let bot = &self.bot;
        if bot.regularity_divisor <= 0.0 {
            anyhow::bail!("regularity_divisor must be positive");
        }
        for (name, weight) in [
            ("regular_weight", bot.regular_weight),
            ("frequency_weight", bot.frequency_weight),
            ("swap_heavy_weight", bot.swap_heavy_weight),
        ] {
            if weight < 0.0 {
                anyhow::bail!("{} cannot be negative", name);
            }
        }

        let programs = &self.programs;
        let ids = programs
            .dex
            .iter()
            .chain(&programs.nft)
            .chain(&programs.bonding_curve)
            .map(|entry| entry.program_id.as_str())
            .chain(programs.memo.iter().map(String::as_str));
        for id in ids {
            if !is_valid_address(id) {
                anyhow::bail!("Invalid program id: {}", id);
            }
        }

        if self.rpc.endpoint.contains("api.mainnet-beta.solana.com") {
            tracing::warn!(
                "Using the public RPC endpoint - deep signature scans will likely be rate limited"
            );
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
    max_retries: {}
    retry_base_delay: {}ms
    page_size: {}
  Sampling:
    signature_limit: {}
    sample_size: {}
  Bot detection:
    regularity_divisor: {}
    high_frequency: > {} tx/hour
    swap_heavy_ratio: {}
    weights: regular={} frequency={} swap_heavy={}
    threshold: {}
  Programs (extra):
    dex: {}
    nft: {}
    bonding_curve: {}
    memo: {}
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.rpc.max_retries,
            self.rpc.retry_base_delay_ms,
            self.rpc.page_size,
            self.sampling.signature_limit,
            self.sampling.sample_size,
            self.bot.regularity_divisor,
            self.bot.high_frequency_tx_per_hour,
            self.bot.swap_heavy_ratio,
            self.bot.regular_weight,
            self.bot.frequency_weight,
            self.bot.swap_heavy_weight,
            self.bot.bot_threshold,
            self.programs.dex.len(),
            self.programs.nft.len(),
            self.programs.bonding_curve.len(),
            self.programs.memo.len(),
        )
    }
}

/// Mask query parameter values of an RPC URL (API keys), keeping the names
pub fn mask_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let masked: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) => format!("{}=***", name),
            None => "***".to_string(),
        })
        .collect();

    format!("{}?{}", base, masked.join("&"))
}
