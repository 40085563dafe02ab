//! Bot-likelihood scoring
//!
//! Three boolean signals, each weighted:
//! - regular timing: gap standard deviation below `avg / regularity_divisor`
//! - high frequency: more than `high_frequency_tx_per_hour` transactions per hour
//! - swap heavy: swaps outnumber transfers by more than `swap_heavy_ratio`
//!
//! The default weights sum to 1.2, so the raw score is clamped to 100.
//! Thresholds are uncalibrated heuristics; override them through `[bot]`
//! in the config file instead of changing the defaults.

use serde::{Deserialize, Serialize};

pub const DEFAULT_REGULARITY_DIVISOR: f64 = 3.0;
pub const DEFAULT_HIGH_FREQUENCY_TX_PER_HOUR: f64 = 50.0;
pub const DEFAULT_SWAP_HEAVY_RATIO: u64 = 5;
pub const DEFAULT_REGULAR_WEIGHT: f64 = 0.6;
pub const DEFAULT_FREQUENCY_WEIGHT: f64 = 0.4;
pub const DEFAULT_SWAP_HEAVY_WEIGHT: f64 = 0.2;
pub const DEFAULT_BOT_THRESHOLD: f64 = 50.0;

/// Maximum bot confidence
pub const MAX_CONFIDENCE: u8 = 100;

/// Tunable bot-detection thresholds and weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotThresholds {
    #[serde(default = "default_regularity_divisor")]
    pub regularity_divisor: f64,

    #[serde(default = "default_high_frequency_tx_per_hour")]
    pub high_frequency_tx_per_hour: f64,

    #[serde(default = "default_swap_heavy_ratio")]
    pub swap_heavy_ratio: u64,

    #[serde(default = "default_regular_weight")]
    pub regular_weight: f64,

    #[serde(default = "default_frequency_weight")]
    pub frequency_weight: f64,

    #[serde(default = "default_swap_heavy_weight")]
    pub swap_heavy_weight: f64,

    /// Confidence strictly above this marks a likely bot
    #[serde(default = "default_bot_threshold")]
    pub bot_threshold: f64,
}

fn default_regularity_divisor() -> f64 {
    DEFAULT_REGULARITY_DIVISOR
}
fn default_high_frequency_tx_per_hour() -> f64 {
    DEFAULT_HIGH_FREQUENCY_TX_PER_HOUR
}
fn default_swap_heavy_ratio() -> u64 {
    DEFAULT_SWAP_HEAVY_RATIO
}
fn default_regular_weight() -> f64 {
    DEFAULT_REGULAR_WEIGHT
}
fn default_frequency_weight() -> f64 {
    DEFAULT_FREQUENCY_WEIGHT
}
fn default_swap_heavy_weight() -> f64 {
    DEFAULT_SWAP_HEAVY_WEIGHT
}
fn default_bot_threshold() -> f64 {
    DEFAULT_BOT_THRESHOLD
}

impl Default for BotThresholds {
    fn default() -> Self {
        Self {
            regularity_divisor: DEFAULT_REGULARITY_DIVISOR,
            high_frequency_tx_per_hour: DEFAULT_HIGH_FREQUENCY_TX_PER_HOUR,
            swap_heavy_ratio: DEFAULT_SWAP_HEAVY_RATIO,
            regular_weight: DEFAULT_REGULAR_WEIGHT,
            frequency_weight: DEFAULT_FREQUENCY_WEIGHT,
            swap_heavy_weight: DEFAULT_SWAP_HEAVY_WEIGHT,
            bot_threshold: DEFAULT_BOT_THRESHOLD,
        }
    }
}

/// Intermediate values behind a bot score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BotSignals {
    pub avg_interval_secs: f64,
    pub std_dev_secs: f64,
    pub tx_per_hour: f64,
    pub regular_patterns: bool,
    pub high_frequency: bool,
    pub swap_heavy: bool,
}

/// Final verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BotScore {
    pub signals: BotSignals,
    /// Always within 0..=100
    pub confidence: u8,
    pub is_likely_bot: bool,
}

/// Absolute gaps between consecutive defined block times, in list order
///
/// An entry without a block time is skipped; the next defined entry is
/// compared against the last defined one.
pub fn timing_gaps<I>(block_times: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<i64>>,
{
    let mut gaps = Vec::new();
    let mut previous: Option<i64> = None;

    for time in block_times.into_iter().flatten() {
        if let Some(prev) = previous {
            gaps.push(prev.abs_diff(time) as f64);
        }
        previous = Some(time);
    }

    gaps
}

/// Arithmetic mean and population standard deviation (both 0 when empty)
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Transactions per hour over the span between newest and oldest block time
///
/// A missing block time counts as 0. Non-positive spans give 0.
pub fn tx_per_hour(count: usize, newest: Option<i64>, oldest: Option<i64>) -> f64 {
    let span = i128::from(newest.unwrap_or(0)) - i128::from(oldest.unwrap_or(0));
    if span > 0 {
        count as f64 / span as f64 * 3600.0
    } else {
        0.0
    }
}

impl BotThresholds {
    pub fn score(
        &self,
        gaps: &[f64],
        tx_per_hour: f64,
        swap_count: u64,
        transfer_count: u64,
    ) -> BotScore {
        let (avg_interval_secs, std_dev_secs) = mean_and_std_dev(gaps);

        let signals = BotSignals {
            avg_interval_secs,
            std_dev_secs,
            tx_per_hour,
            regular_patterns: std_dev_secs < avg_interval_secs / self.regularity_divisor,
            high_frequency: tx_per_hour > self.high_frequency_tx_per_hour,
            swap_heavy: swap_count > transfer_count.saturating_mul(self.swap_heavy_ratio),
        };

        let weight = |on: bool, w: f64| if on { w } else { 0.0 };
        let raw = 100.0
            * (weight(signals.regular_patterns, self.regular_weight)
                + weight(signals.high_frequency, self.frequency_weight)
                + weight(signals.swap_heavy, self.swap_heavy_weight));

        let confidence = raw.round().clamp(0.0, MAX_CONFIDENCE as f64) as u8;

        BotScore {
            signals,
            confidence,
            is_likely_bot: confidence as f64 > self.bot_threshold,
        }
    }
}
