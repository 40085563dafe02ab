//! Wallet-level statistics
//!
//! Two-tier sampling:
//! - a shallow signature list (default 100) drives the failure count, the
//!   success rate, last activity and the timing signals
//! - a smaller classified sample (default 20) drives the category counts
//! - the total success count comes from a full paginated scan done by the
//!   [`SignatureCounter`] collaborator
//!
//! # Architecture
//!
//! ```text
//! TransactionSource ─► WalletAnalyzer ─► TransactionAnalyzer (per signature, concurrent)
//!                            │
//!                            └─► WalletStatsAggregator ─► BotThresholds::score
//! ```

pub mod bot;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::TransactionCategory;
use crate::config::SamplingConfig;
use crate::error::Result;
use crate::programs::validate_address;
use crate::transaction::{RawTransaction, TransactionAnalysis, TransactionAnalyzer, TransactionRecord};

pub use bot::{BotScore, BotSignals, BotThresholds};

/// One entry of `getSignaturesForAddress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureInfo {
    pub fn is_success(&self) -> bool {
        self.err.is_none()
    }
}

/// Wallet statistics computed from one signature list and sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletStats {
    pub address: String,
    /// Error-free signatures over the wallet's whole history
    pub success_count: u64,
    /// Failed signatures in the signature list
    pub fail_count: u64,
    /// Fraction in [0, 1] over the signature list
    pub success_rate: f64,
    pub swap_count: u64,
    pub transfer_count: u64,
    pub nft_count: u64,
    pub pumpfun_count: u64,
    pub last_activity: Option<i64>,
    pub is_likely_bot: bool,
    pub bot_confidence: u8,
    pub signature_sample_size: usize,
    pub classified_sample_size: usize,
    pub bot_signals: BotSignals,
}

impl WalletStats {
    /// Stats for an address without any signatures
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            success_count: 0,
            fail_count: 0,
            success_rate: 0.0,
            swap_count: 0,
            transfer_count: 0,
            nft_count: 0,
            pumpfun_count: 0,
            last_activity: None,
            is_likely_bot: false,
            bot_confidence: 0,
            signature_sample_size: 0,
            classified_sample_size: 0,
            bot_signals: BotSignals::default(),
        }
    }
}

/// Counts every error-free signature of an address (paginated)
#[async_trait]
pub trait SignatureCounter: Send + Sync {
    async fn count_successful_signatures(&self, address: &str) -> Result<u64>;
}

/// Fetches signatures and transactions for analysis
#[async_trait]
pub trait TransactionSource: SignatureCounter {
    /// Most recent signatures, newest first
    async fn recent_signatures(&self, address: &str, limit: usize) -> Result<Vec<SignatureInfo>>;

    /// Full transaction, or None if the node does not have it
    async fn transaction(&self, signature: &str) -> Result<Option<RawTransaction>>;
}

/// Folds a signature list and a classified sample into [`WalletStats`]
#[derive(Debug, Clone, Default)]
pub struct WalletStatsAggregator {
    thresholds: BotThresholds,
}

impl WalletStatsAggregator {
    pub fn new(thresholds: BotThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &BotThresholds {
        &self.thresholds
    }

    /// Compute stats, asking the counter for the deep success count
    ///
    /// An empty signature list returns [`WalletStats::empty`] without
    /// touching the counter. Counter failures are returned as-is.
    pub async fn aggregate(
        &self,
        address: &str,
        signatures: &[SignatureInfo],
        sample: &[TransactionRecord],
        counter: &dyn SignatureCounter,
    ) -> Result<WalletStats> {
        if signatures.is_empty() {
            debug!("No signatures for {}, skipping deep count", address);
            return Ok(WalletStats::empty(address));
        }

        let success_count = counter.count_successful_signatures(address).await?;
        Ok(self.summarize(address, signatures, sample, success_count))
    }

    /// Pure part of [`Self::aggregate`]
    pub fn summarize(
        &self,
        address: &str,
        signatures: &[SignatureInfo],
        sample: &[TransactionRecord],
        success_count: u64,
    ) -> WalletStats {
        if signatures.is_empty() {
            return WalletStats::empty(address);
        }

        let count = |category: TransactionCategory| {
            sample.iter().filter(|tx| tx.category == category).count() as u64
        };
        let swap_count = count(TransactionCategory::Swap);
        let transfer_count = count(TransactionCategory::Transfer);

        let successes = signatures.iter().filter(|s| s.is_success()).count();
        let fail_count = (signatures.len() - successes) as u64;

        let gaps = bot::timing_gaps(
            signatures
                .iter()
                .filter(|s| s.is_success())
                .map(|s| s.block_time),
        );
        let newest = signatures.first().and_then(|s| s.block_time);
        let oldest = signatures.last().and_then(|s| s.block_time);
        let tx_per_hour = bot::tx_per_hour(signatures.len(), newest, oldest);

        let score = self
            .thresholds
            .score(&gaps, tx_per_hour, swap_count, transfer_count);

        WalletStats {
            address: address.to_string(),
            success_count,
            fail_count,
            success_rate: successes as f64 / signatures.len() as f64,
            swap_count,
            transfer_count,
            nft_count: count(TransactionCategory::Nft),
            pumpfun_count: count(TransactionCategory::Pumpfun),
            last_activity: newest,
            is_likely_bot: score.is_likely_bot,
            bot_confidence: score.confidence,
            signature_sample_size: signatures.len(),
            classified_sample_size: sample.len(),
            bot_signals: score.signals,
        }
    }
}

/// Stats plus the classified sample they were computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletAnalysis {
    pub stats: WalletStats,
    pub sample: Vec<TransactionRecord>,
}

/// End-to-end wallet analysis over a [`TransactionSource`]
pub struct WalletAnalyzer<S> {
    source: Arc<S>,
    transactions: TransactionAnalyzer,
    aggregator: WalletStatsAggregator,
    sampling: SamplingConfig,
}

impl<S: TransactionSource> WalletAnalyzer<S> {
    pub fn new(
        source: Arc<S>,
        transactions: TransactionAnalyzer,
        aggregator: WalletStatsAggregator,
    ) -> Self {
        Self {
            source,
            transactions,
            aggregator,
            sampling: SamplingConfig::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn sampling(&self) -> SamplingConfig {
        self.sampling
    }

    /// Fetch, classify and aggregate
    ///
    /// Only a failure to fetch the signature list (or the deep count) is
    /// fatal; individual transactions that fail become placeholders.
    pub async fn analyze_wallet(&self, address: &str) -> Result<WalletAnalysis> {
        validate_address(address)?;

        let signatures = self
            .source
            .recent_signatures(address, self.sampling.signature_limit)
            .await?;

        info!(
            "Fetched {} signatures for {}, classifying up to {}",
            signatures.len(),
            address,
            self.sampling.sample_size
        );

        let sample_signatures: Vec<&SignatureInfo> = signatures
            .iter()
            .filter(|s| s.is_success())
            .take(self.sampling.sample_size)
            .collect();

        let sample = join_all(sample_signatures.into_iter().map(|sig| self.fetch_record(sig))).await;

        let stats = self
            .aggregator
            .aggregate(address, &signatures, &sample, self.source.as_ref())
            .await?;

        Ok(WalletAnalysis { stats, sample })
    }

    /// Analyze one transaction by signature
    pub async fn analyze_transaction(&self, signature: &str) -> Result<Option<TransactionAnalysis>> {
        let raw = self.source.transaction(signature).await?;
        Ok(raw.map(|raw| self.transactions.analyze(signature, &raw)))
    }

    async fn fetch_record(&self, sig: &SignatureInfo) -> TransactionRecord {
        match self.source.transaction(&sig.signature).await {
            Ok(Some(raw)) => {
                let mut record = self.transactions.record(&sig.signature, &raw);
                if record.block_time.is_none() {
                    record.block_time = sig.block_time;
                }
                record
            }
            Ok(None) => {
                warn!("Transaction {} not found, using placeholder", sig.signature);
                TransactionRecord::placeholder(&sig.signature, sig.block_time)
            }
            Err(e) => {
                warn!(
                    "Failed to fetch transaction {}: {}, using placeholder",
                    sig.signature, e
                );
                TransactionRecord::placeholder(&sig.signature, sig.block_time)
            }
        }
    }
}
