//! Swap volume inference for bonding-curve trades
//!
//! Pump.fun buy/sell instructions do not expose the SOL amount actually
//! traded, so it is approximated from native balance changes at fixed
//! positions in the account list.
//!
//! # WARNING: Protocol-version dependent
//! The account indices below were observed on live pump.fun transactions.
//! If pump.fun reorders its instruction accounts these numbers silently go
//! wrong. Swap in another [`SwapVolumeStrategy`] (or
//! [`DisabledVolumeInference`]) instead of editing the balance code.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::LAMPORTS_PER_SOL;

/// Direction of a swap from the wallet's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Wallet spent SOL
    Buy,
    /// Wallet received SOL
    Sell,
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::Buy => f.write_str("buy"),
            SwapDirection::Sell => f.write_str("sell"),
        }
    }
}

/// Inferred swap direction and approximate SOL volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapVolume {
    pub direction: SwapDirection,
    /// Whole SOL
    pub native_volume: f64,
}

/// Replaceable volume-inference strategy
pub trait SwapVolumeStrategy: Send + Sync + fmt::Debug {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Infer the swap from per-account lamport changes, indexed by account
    /// position. Returns None when no direction can be determined.
    fn infer(&self, lamport_changes: &[i64]) -> Option<SwapVolume>;
}

/// Never infers a volume
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledVolumeInference;

impl SwapVolumeStrategy for DisabledVolumeInference {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn infer(&self, _lamport_changes: &[i64]) -> Option<SwapVolume> {
        None
    }
}

/// Fixed account-index heuristic for pump.fun bonding-curve trades
///
/// - Direction: sign of the change at [`Self::DIRECTION_INDEX`] (the fee
///   payer). Negative is a buy, positive a sell.
/// - Sell: sum of SOL leaving accounts 1, 2 and 5.
/// - Buy: absolute change at account 3; when account 3 did not move, the
///   change at account 2 is used instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct PumpFunIndexHeuristic;

impl PumpFunIndexHeuristic {
    pub const DIRECTION_INDEX: usize = 0;
    pub const SELL_INDICES: [usize; 3] = [1, 2, 5];
    pub const BUY_INDEX: usize = 3;
    pub const BUY_FALLBACK_INDEX: usize = 2;
}

impl SwapVolumeStrategy for PumpFunIndexHeuristic {
    fn name(&self) -> &'static str {
        "pumpfun_account_index"
    }

    fn infer(&self, lamport_changes: &[i64]) -> Option<SwapVolume> {
        let signal = *lamport_changes.get(Self::DIRECTION_INDEX)?;
        let direction = match signal {
            0 => return None,
            s if s < 0 => SwapDirection::Buy,
            _ => SwapDirection::Sell,
        };

        let to_sol = |lamports: i64| (lamports as f64 / LAMPORTS_PER_SOL).abs();
        let mut volume = 0.0;

        for (index, &change) in lamport_changes.iter().enumerate() {
            match direction {
                SwapDirection::Sell if change < 0 && Self::SELL_INDICES.contains(&index) => {
                    volume += to_sol(change);
                }
                SwapDirection::Buy if index == Self::BUY_INDEX && change != 0 => {
                    volume += to_sol(change);
                }
                SwapDirection::Buy if index == Self::BUY_INDEX => {
                    volume = lamport_changes
                        .get(Self::BUY_FALLBACK_INDEX)
                        .map(|&c| to_sol(c))
                        .unwrap_or(0.0);
                }
                _ => {}
            }
        }

        Some(SwapVolume {
            direction,
            native_volume: volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL: i64 = 1_000_000_000;

    #[test]
    fn test_buy_uses_index_three() {
        let changes = [-SOL - 5_000, 0, 10_000_000, SOL, 0];
        let swap = PumpFunIndexHeuristic.infer(&changes).unwrap();
        assert_eq!(swap.direction, SwapDirection::Buy);
        assert!((swap.native_volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_buy_falls_back_to_index_two() {
        let changes = [-SOL / 2, 0, SOL / 2, 0, 0];
        let swap = PumpFunIndexHeuristic.infer(&changes).unwrap();
        assert_eq!(swap.direction, SwapDirection::Buy);
        assert!((swap.native_volume - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sell_sums_negative_fixed_indices() {
        // Index 3 and 4 are ignored on sells, index 2 is positive so skipped
        let changes = [2 * SOL, -SOL, SOL / 4, -SOL, -SOL, -SOL / 2];
        let swap = PumpFunIndexHeuristic.infer(&changes).unwrap();
        assert_eq!(swap.direction, SwapDirection::Sell);
        assert!((swap.native_volume - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_direction() {
        assert_eq!(PumpFunIndexHeuristic.infer(&[]), None);
        assert_eq!(PumpFunIndexHeuristic.infer(&[0, -SOL, SOL]), None);
    }

    #[test]
    fn test_short_account_list_buy() {
        let swap = PumpFunIndexHeuristic.infer(&[-SOL, SOL]).unwrap();
        assert_eq!(swap.direction, SwapDirection::Buy);
        assert_eq!(swap.native_volume, 0.0);
    }

    #[test]
    fn test_disabled() {
        assert_eq!(DisabledVolumeInference.infer(&[-SOL, 0, 0, SOL]), None);
    }
}
