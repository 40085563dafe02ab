//! Native and token balance deltas
//!
//! Correlates the pre/post balance arrays of a transaction's metadata by
//! account index and produces one [`BalanceSnapshot`] per touched account.

pub mod volume;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::classify::TransactionCategory;

pub use volume::{
    DisabledVolumeInference, PumpFunIndexHeuristic, SwapDirection, SwapVolume, SwapVolumeStrategy,
};

/// Lamports per whole SOL
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Token balance entry from transaction metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenBalance {
    pub account_index: usize,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub ui_token_amount: RawTokenAmount,
}

/// Raw + UI token amount as returned by the node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenAmount {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub ui_amount: Option<f64>,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl RawTokenAmount {
    /// Decimal-scaled amount: the UI string if present, then the UI number,
    /// then the raw amount scaled by decimals
    pub fn ui_value(&self) -> f64 {
        if let Some(value) = self
            .ui_amount_string
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok())
        {
            return value;
        }
        if let Some(value) = self.ui_amount {
            return value;
        }
        match (self.amount.as_deref(), self.decimals) {
            (Some(raw), Some(decimals)) => raw
                .parse::<f64>()
                .map(|v| v / 10f64.powi(decimals as i32))
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Change of one token account across a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenDelta {
    pub mint: String,
    pub owner: String,
    /// Integer string, full precision
    pub pre_raw_amount: String,
    pub post_raw_amount: String,
    pub pre_ui_amount: f64,
    pub post_ui_amount: f64,
    /// Always `post_ui_amount - pre_ui_amount`
    pub ui_change: f64,
    pub decimals: u8,
}

impl TokenDelta {
    /// Build a delta from whichever sides are present
    pub fn from_balances(pre: Option<&RawTokenBalance>, post: Option<&RawTokenBalance>) -> Self {
        let pick = |f: fn(&RawTokenBalance) -> Option<String>| {
            pre.and_then(f).or_else(|| post.and_then(f)).unwrap_or_default()
        };
        let raw_amount = |side: Option<&RawTokenBalance>| {
            side.and_then(|b| b.ui_token_amount.amount.clone())
                .unwrap_or_else(|| "0".to_string())
        };
        let ui_amount = |side: Option<&RawTokenBalance>| {
            side.map(|b| b.ui_token_amount.ui_value()).unwrap_or(0.0)
        };

        let pre_ui_amount = ui_amount(pre);
        let post_ui_amount = ui_amount(post);

        Self {
            mint: pick(|b| Some(b.mint.clone())),
            owner: pick(|b| b.owner.clone()),
            pre_raw_amount: raw_amount(pre),
            post_raw_amount: raw_amount(post),
            pre_ui_amount,
            post_ui_amount,
            ui_change: post_ui_amount - pre_ui_amount,
            decimals: pre
                .and_then(|b| b.ui_token_amount.decimals)
                .or_else(|| post.and_then(|b| b.ui_token_amount.decimals))
                .unwrap_or(0),
        }
    }
}

/// Balances of one account before and after a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSnapshot {
    pub account_index: usize,
    pub account_address: String,
    /// Whole SOL
    pub pre_native: f64,
    pub post_native: f64,
    /// `post_native - pre_native`, signed
    pub native_change: f64,
    pub token_deltas: Vec<TokenDelta>,
}

impl BalanceSnapshot {
    fn native(index: usize, address: String, pre: u64, post: u64) -> Self {
        Self {
            account_index: index,
            account_address: address,
            pre_native: pre as f64 / LAMPORTS_PER_SOL,
            post_native: post as f64 / LAMPORTS_PER_SOL,
            native_change: (post as i128 - pre as i128) as f64 / LAMPORTS_PER_SOL,
            token_deltas: Vec::new(),
        }
    }

    /// True if the account's SOL or any token balance was touched
    pub fn has_changes(&self) -> bool {
        self.native_change != 0.0 || !self.token_deltas.is_empty()
    }
}

/// Balance arrays of one transaction, all indexed by account position
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceInputs<'a> {
    pub account_keys: &'a [String],
    pub pre_balances: Option<&'a [u64]>,
    pub post_balances: Option<&'a [u64]>,
    pub pre_token_balances: &'a [RawTokenBalance],
    pub post_token_balances: &'a [RawTokenBalance],
}

/// Whether balance metadata was available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Computed,
    /// Node returned no pre/post balance arrays; not an error
    NoBalanceData,
}

/// Output of [`BalanceDeltaCalculator::compute`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceDeltas {
    pub status: BalanceStatus,
    pub snapshots: Vec<BalanceSnapshot>,
    /// Only inferred for bonding-curve trades
    pub swap_volume: Option<SwapVolume>,
}

impl BalanceDeltas {
    pub fn no_balance_data() -> Self {
        Self {
            status: BalanceStatus::NoBalanceData,
            snapshots: Vec::new(),
            swap_volume: None,
        }
    }

    /// Snapshot of one account by index
    pub fn account(&self, index: usize) -> Option<&BalanceSnapshot> {
        self.snapshots.iter().find(|s| s.account_index == index)
    }
}

/// Computes per-account balance deltas
#[derive(Debug, Clone)]
pub struct BalanceDeltaCalculator {
    volume_strategy: Arc<dyn SwapVolumeStrategy>,
}

impl Default for BalanceDeltaCalculator {
    fn default() -> Self {
        Self::new(Arc::new(PumpFunIndexHeuristic))
    }
}

impl BalanceDeltaCalculator {
    pub fn new(volume_strategy: Arc<dyn SwapVolumeStrategy>) -> Self {
        Self { volume_strategy }
    }

    /// Calculator that never infers swap volume
    pub fn without_volume_inference() -> Self {
        Self::new(Arc::new(DisabledVolumeInference))
    }

    pub fn volume_strategy(&self) -> &dyn SwapVolumeStrategy {
        self.volume_strategy.as_ref()
    }

    /// Compute deltas for every account present in the native or token balances
    pub fn compute(&self, inputs: &BalanceInputs<'_>, category: TransactionCategory) -> BalanceDeltas {
        let (Some(pre), Some(post)) = (inputs.pre_balances, inputs.post_balances) else {
            debug!("No balance information available");
            return BalanceDeltas::no_balance_data();
        };

        let address = |index: usize| {
            inputs
                .account_keys
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("account#{}", index))
        };

        let native_len = pre.len().max(post.len());
        let lamport_changes: Vec<i64> = (0..native_len)
            .map(|i| {
                let before = pre.get(i).copied().unwrap_or(0) as i128;
                let after = post.get(i).copied().unwrap_or(0) as i128;
                (after - before) as i64
            })
            .collect();

        let mut snapshots: BTreeMap<usize, BalanceSnapshot> = (0..native_len)
            .map(|i| {
                let before = pre.get(i).copied().unwrap_or(0);
                let after = post.get(i).copied().unwrap_or(0);
                (i, BalanceSnapshot::native(i, address(i), before, after))
            })
            .collect();

        let pre_tokens = index_token_balances(inputs.pre_token_balances);
        let post_tokens = index_token_balances(inputs.post_token_balances);
        let token_indices: BTreeSet<usize> =
            pre_tokens.keys().chain(post_tokens.keys()).copied().collect();

        for index in token_indices {
            let delta = TokenDelta::from_balances(
                pre_tokens.get(&index).copied(),
                post_tokens.get(&index).copied(),
            );
            snapshots
                .entry(index)
                .or_insert_with(|| BalanceSnapshot::native(index, address(index), 0, 0))
                .token_deltas
                .push(delta);
        }

        let swap_volume = if category == TransactionCategory::Pumpfun {
            let volume = self.volume_strategy.infer(&lamport_changes);
            debug!(
                "Swap volume via {}: {:?}",
                self.volume_strategy.name(),
                volume
            );
            volume
        } else {
            None
        };

        BalanceDeltas {
            status: BalanceStatus::Computed,
            snapshots: snapshots.into_values().collect(),
            swap_volume,
        }
    }
}

fn index_token_balances(balances: &[RawTokenBalance]) -> BTreeMap<usize, &RawTokenBalance> {
    balances.iter().map(|b| (b.account_index, b)).collect()
}
