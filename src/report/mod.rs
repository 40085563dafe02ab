//! Fixed-column text reports for terminal output

use chrono::{DateTime, SecondsFormat};

use crate::balance::BalanceStatus;
use crate::transaction::{TransactionAnalysis, TransactionRecord};
use crate::wallet::WalletStats;

const RULE_WIDTH: usize = 80;

/// Renders analysis results as plain text
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn wallet_stats(stats: &WalletStats) -> String {
        let signals = &stats.bot_signals;
        let verdict = if stats.is_likely_bot { "LIKELY BOT" } else { "likely human" };

        let mut lines = vec![
            format!("Wallet: {}", stats.address),
            "-".repeat(RULE_WIDTH),
            row("Successful (all time)", stats.success_count),
            row("Failed (recent)", stats.fail_count),
            row("Success rate", format!("{:.1}%", stats.success_rate * 100.0)),
            row("Last activity", timestamp(stats.last_activity)),
            String::new(),
            format!(
                "Activity (sample of {} transactions from {} signatures):",
                stats.classified_sample_size, stats.signature_sample_size
            ),
            row("  Swaps", stats.swap_count),
            row("  Transfers", stats.transfer_count),
            row("  NFT", stats.nft_count),
            row("  Pump.fun", stats.pumpfun_count),
            String::new(),
            row(
                "Bot verdict",
                format!("{} ({}% confidence)", verdict, stats.bot_confidence),
            ),
            row("  Avg interval", format!("{:.1}s", signals.avg_interval_secs)),
            row("  Std deviation", format!("{:.1}s", signals.std_dev_secs)),
            row("  Tx per hour", format!("{:.1}", signals.tx_per_hour)),
            row("  Regular timing", yes_no(signals.regular_patterns)),
            row("  High frequency", yes_no(signals.high_frequency)),
            row("  Swap heavy", yes_no(signals.swap_heavy)),
        ];
        lines.push(String::new());
        lines.join("\n")
    }

    pub fn transaction(analysis: &TransactionAnalysis) -> String {
        let record = &analysis.record;
        let mut lines = vec![
            "Transaction Summary:".to_string(),
            "-".repeat(RULE_WIDTH),
            row("Signature", &record.signature),
            row("Status", if record.succeeded { "success" } else { "failed" }),
            row("Category", record.category),
            row("Slot", analysis.slot),
            row("Timestamp", timestamp(record.block_time)),
            row("Fee", format!("{:.9} SOL", record.fee_native)),
            row(
                "Compute units",
                analysis
                    .compute_units
                    .map(|cu| cu.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
        ];

        if let Some(swap) = &analysis.swap_volume {
            lines.push(row(
                "Swap (estimated)",
                format!("{} {:.9} SOL", swap.direction, swap.native_volume),
            ));
        }

        lines.push(String::new());
        lines.push("Signers:".to_string());
        lines.extend(analysis.signers.iter().map(|s| format!("- {}", s)));

        lines.push(String::new());
        lines.push("Programs Involved:".to_string());
        lines.extend(analysis.programs_involved.iter().map(|p| format!("- {}", p)));

        lines.push(String::new());
        lines.push("Accounts:".to_string());
        for account in &analysis.account_roles {
            lines.push(format!(
                "{:<4} {:<24} {}",
                account.index, account.role, account.address
            ));
        }

        lines.push(String::new());
        lines.push("Instructions:".to_string());
        lines.push(format!("{:<4} {:<14} {:<24} {}", "#", "FAMILY", "TYPE", "PROGRAM"));
        for (i, ix) in record.instructions.iter().enumerate() {
            lines.push(format!(
                "{:<4} {:<14} {:<24} {}",
                i,
                ix.family.as_str(),
                ix.instruction_type,
                ix.program_id
            ));
            if let Some(message) = ix.payload.message() {
                lines.push(format!("     memo: {}", message));
            }
        }

        if !analysis.inner_transfers.is_empty() {
            lines.push(String::new());
            lines.push("Inner Token Transfers:".to_string());
            for transfer in &analysis.inner_transfers {
                let amount = transfer
                    .ui_amount
                    .map(|ui| ui.to_string())
                    .unwrap_or_else(|| format!("{} (raw)", transfer.amount));
                lines.push(format!(
                    "  [{}] {} {} -> {}",
                    transfer.outer_index,
                    amount,
                    transfer.source.as_deref().unwrap_or("?"),
                    transfer.destination.as_deref().unwrap_or("?"),
                ));
                if let Some(mint) = &transfer.mint {
                    lines.push(format!("      mint: {}", mint));
                }
            }
        }

        lines.push(String::new());
        lines.push("Balance Changes:".to_string());
        if analysis.balance_status == BalanceStatus::NoBalanceData {
            lines.push("  (no balance data)".to_string());
        }
        for snapshot in record.balances.iter().filter(|s| s.has_changes()) {
            lines.push(format!("{}:", snapshot.account_address));
            lines.push(format!(
                "  SOL: {:.9} -> {:.9} ({:+.9})",
                snapshot.pre_native, snapshot.post_native, snapshot.native_change
            ));
            for token in &snapshot.token_deltas {
                lines.push(format!("  Mint {} (owner {}):", token.mint, token.owner));
                lines.push(format!(
                    "    {} -> {} ({:+})",
                    token.pre_ui_amount, token.post_ui_amount, token.ui_change
                ));
            }
        }

        lines.push(String::new());
        lines.join("\n")
    }

    /// One row per record
    pub fn transactions(records: &[TransactionRecord]) -> String {
        let mut lines = vec![
            format!(
                "{:<90} {:<10} {:<8} {:<14} {}",
                "SIGNATURE", "CATEGORY", "STATUS", "FEE (SOL)", "TIME"
            ),
            "-".repeat(RULE_WIDTH + 60),
        ];

        for record in records {
            lines.push(format!(
                "{:<90} {:<10} {:<8} {:<14.9} {}",
                record.signature,
                record.category.as_str(),
                if record.succeeded { "ok" } else { "failed" },
                record.fee_native,
                timestamp(record.block_time)
            ));
        }

        lines.push(String::new());
        lines.join("\n")
    }
}

fn row(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<24} {}", format!("{}:", label), value)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Unix seconds as RFC 3339 (UTC), or "N/A"
fn timestamp(block_time: Option<i64>) -> String {
    block_time
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "N/A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{BalanceSnapshot, SwapDirection, SwapVolume, TokenDelta};
    use crate::classify::TransactionCategory;
    use crate::transaction::{AccountRole, TokenTransfer};

    fn analysis() -> TransactionAnalysis {
        let mut record = TransactionRecord::placeholder("5sig", Some(1_700_000_000));
        record.succeeded = true;
        record.category = TransactionCategory::Pumpfun;
        record.fee_native = 0.000005;
        record.balances = vec![
            BalanceSnapshot {
                account_index: 0,
                account_address: "Payer".to_string(),
                pre_native: 1.0,
                post_native: 0.8,
                native_change: -0.2,
                token_deltas: vec![],
            },
            BalanceSnapshot {
                account_index: 1,
                account_address: "Untouched".to_string(),
                pre_native: 1.0,
                post_native: 1.0,
                native_change: 0.0,
                token_deltas: vec![],
            },
            BalanceSnapshot {
                account_index: 2,
                account_address: "TokenAccount".to_string(),
                pre_native: 0.002,
                post_native: 0.002,
                native_change: 0.0,
                token_deltas: vec![TokenDelta {
                    mint: "MintX".to_string(),
                    owner: "Payer".to_string(),
                    pre_raw_amount: "0".to_string(),
                    post_raw_amount: "1500000".to_string(),
                    pre_ui_amount: 0.0,
                    post_ui_amount: 1.5,
                    ui_change: 1.5,
                    decimals: 6,
                }],
            },
        ];

        TransactionAnalysis {
            record,
            slot: 99,
            compute_units: None,
            signers: vec!["Payer".to_string()],
            programs_involved: vec!["Prog".to_string()],
            balance_status: BalanceStatus::Computed,
            swap_volume: Some(SwapVolume {
                direction: SwapDirection::Buy,
                native_volume: 0.19,
            }),
            inner_transfers: vec![TokenTransfer {
                outer_index: 1,
                program_id: "Tokenkeg".to_string(),
                source: Some("PoolVault".to_string()),
                destination: Some("TokenAccount".to_string()),
                authority: Some("PoolAuthority".to_string()),
                mint: Some("MintX".to_string()),
                amount: "1500000".to_string(),
                ui_amount: Some(1.5),
            }],
            account_roles: vec![
                AccountRole {
                    index: 0,
                    address: "Payer".to_string(),
                    role: "Fee Payer".to_string(),
                },
                AccountRole {
                    index: 2,
                    address: "TokenAccount".to_string(),
                    role: "Token Account".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_transaction_report() {
        let text = ReportFormatter::transaction(&analysis());

        assert!(text.contains("Status:"));
        assert!(text.contains("success"));
        assert!(text.contains("2023-11-14T22:13:20Z"));
        assert!(text.contains("0.000005000 SOL"));
        assert!(text.contains("N/A"));
        assert!(text.contains("buy 0.190000000 SOL"));
        assert!(text.contains("- Payer"));
        assert!(text.contains("SOL: 1.000000000 -> 0.800000000 (-0.200000000)"));
        assert!(text.contains("Mint MintX (owner Payer):"));
        assert!(text.contains("0 -> 1.5 (+1.5)"));
        assert!(!text.contains("Untouched"));
        assert!(text.contains("0    Fee Payer                Payer"));
        assert!(text.contains("[1] 1.5 PoolVault -> TokenAccount"));
        assert!(text.contains("mint: MintX"));
    }

    #[test]
    fn test_transaction_report_without_balances() {
        let mut analysis = analysis();
        analysis.balance_status = BalanceStatus::NoBalanceData;
        analysis.record.balances.clear();
        analysis.inner_transfers.clear();
        let text = ReportFormatter::transaction(&analysis);
        assert!(text.contains("(no balance data)"));
        assert!(!text.contains("Inner Token Transfers:"));
    }

    #[test]
    fn test_wallet_report() {
        let mut stats = WalletStats::empty("Wallet1");
        stats.success_rate = 0.875;
        stats.bot_confidence = 100;
        stats.is_likely_bot = true;
        stats.last_activity = Some(0);

        let text = ReportFormatter::wallet_stats(&stats);
        assert!(text.contains("Wallet: Wallet1"));
        assert!(text.contains("87.5%"));
        assert!(text.contains("1970-01-01T00:00:00Z"));
        assert!(text.contains("LIKELY BOT (100% confidence)"));
    }

    #[test]
    fn test_wallet_report_empty() {
        let text = ReportFormatter::wallet_stats(&WalletStats::empty("Nobody"));
        assert!(text.contains("0.0%"));
        assert!(text.contains("N/A"));
        assert!(text.contains("likely human (0% confidence)"));
    }

    #[test]
    fn test_transactions_table() {
        let records = vec![
            TransactionRecord::placeholder("sigA", None),
            TransactionRecord {
                succeeded: true,
                category: TransactionCategory::Swap,
                ..TransactionRecord::placeholder("sigB", Some(1_700_000_000))
            },
        ];
        let text = ReportFormatter::transactions(&records);
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[2].starts_with("sigA"));
        assert!(rows[2].contains("failed"));
        assert!(rows[3].contains("swap"));
        assert!(rows[3].contains("ok"));
    }
}
