//! Per-transaction analysis
//!
//! Deserializes the node's `getTransaction` response and runs it through
//! normalization, classification and balance-delta computation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::balance::{
    BalanceDeltaCalculator, BalanceInputs, BalanceSnapshot, BalanceStatus, RawTokenBalance,
    SwapVolume, LAMPORTS_PER_SOL,
};
use crate::classify::{TransactionCategory, TransactionClassifier};
use crate::instruction::{InstructionNormalizer, InstructionRecord, ProgramFamily, RawInstruction};
use crate::programs::ProgramRegistry;

/// `getTransaction` result (`jsonParsed` encoding)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<RawMeta>,
    #[serde(default)]
    pub transaction: RawTransactionBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransactionBody {
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub message: RawMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub account_keys: Vec<RawAccountKey>,
    #[serde(default)]
    pub header: Option<RawMessageHeader>,
    #[serde(default)]
    pub instructions: Vec<RawInstruction>,
}

/// Only present in the `json` (unparsed) encoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageHeader {
    #[serde(default)]
    pub num_required_signatures: usize,
}

/// Account key: a bare address (`json`) or an annotated entry (`jsonParsed`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAccountKey {
    Plain(String),
    Parsed {
        pubkey: String,
        #[serde(default)]
        signer: bool,
        #[serde(default)]
        writable: bool,
    },
}

impl RawAccountKey {
    pub fn address(&self) -> &str {
        match self {
            RawAccountKey::Plain(address) => address,
            RawAccountKey::Parsed { pubkey, .. } => pubkey,
        }
    }
}

/// Transaction status metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Option<Vec<u64>>,
    #[serde(default)]
    pub post_balances: Option<Vec<u64>>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<RawTokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<RawTokenBalance>>,
    #[serde(default)]
    pub inner_instructions: Option<Vec<RawInnerInstructions>>,
    #[serde(default)]
    pub compute_units_consumed: Option<u64>,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
}

/// Instructions invoked by the top-level instruction at `index`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInnerInstructions {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub instructions: Vec<RawInstruction>,
}

impl RawTransaction {
    pub fn account_keys(&self) -> Vec<String> {
        self.transaction
            .message
            .account_keys
            .iter()
            .map(|k| k.address().to_string())
            .collect()
    }

    /// Signing accounts, from the parsed key flags or the message header
    pub fn signers(&self) -> Vec<String> {
        let message = &self.transaction.message;
        let required = message
            .header
            .as_ref()
            .map(|h| h.num_required_signatures)
            .unwrap_or(0);

        message
            .account_keys
            .iter()
            .enumerate()
            .filter(|(index, key)| match key {
                RawAccountKey::Parsed { signer, .. } => *signer,
                RawAccountKey::Plain(_) => *index < required,
            })
            .map(|(_, key)| key.address().to_string())
            .collect()
    }
}

/// One analyzed transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub signature: String,
    /// Unix seconds
    pub block_time: Option<i64>,
    pub fee_native: f64,
    pub succeeded: bool,
    pub category: TransactionCategory,
    pub instructions: Vec<InstructionRecord>,
    pub balances: Vec<BalanceSnapshot>,
}

impl TransactionRecord {
    /// Stand-in for a transaction that could not be fetched or parsed
    pub fn placeholder(signature: impl Into<String>, block_time: Option<i64>) -> Self {
        Self {
            signature: signature.into(),
            block_time,
            fee_native: 0.0,
            succeeded: false,
            category: TransactionCategory::Unknown,
            instructions: Vec::new(),
            balances: Vec::new(),
        }
    }
}

/// Token movement recovered from an inner `transfer` or `transferChecked`
///
/// AMMs move the traded tokens through token-program CPIs, so these carry
/// the swap amounts that top-level instructions do not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenTransfer {
    /// Top-level instruction that issued the transfer
    pub outer_index: usize,
    pub program_id: String,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub authority: Option<String>,
    pub mint: Option<String>,
    /// Integer amount in base units, as reported by the node
    pub amount: String,
    pub ui_amount: Option<f64>,
}

impl TokenTransfer {
    /// Extract a transfer from a normalized token instruction
    pub fn from_record(outer_index: usize, record: &InstructionRecord) -> Option<Self> {
        if record.family != ProgramFamily::Token {
            return None;
        }

        let payload = &record.payload;
        let (amount, ui_amount) = match record.instruction_type.as_str() {
            "transfer" => (payload.field("amount").and_then(amount_text)?, None),
            "transferChecked" => {
                let token_amount = payload.field("tokenAmount")?;
                (
                    token_amount.get("amount").and_then(amount_text)?,
                    token_amount.get("uiAmount").and_then(Value::as_f64),
                )
            }
            _ => return None,
        };

        let text = |key: &str| {
            payload
                .field(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            outer_index,
            program_id: record.program_id.clone(),
            source: text("source"),
            destination: text("destination"),
            authority: text("authority").or_else(|| text("multisigAuthority")),
            mint: text("mint"),
            amount,
            ui_amount,
        })
    }
}

fn amount_text(value: &Value) -> Option<String> {
    match value {
        Value::String(amount) => Some(amount.clone()),
        Value::Number(amount) => Some(amount.to_string()),
        _ => None,
    }
}

/// Label for one account key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRole {
    pub index: usize,
    pub address: String,
    pub role: String,
}

/// Full analysis of one transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAnalysis {
    pub record: TransactionRecord,
    pub slot: u64,
    pub compute_units: Option<u64>,
    pub signers: Vec<String>,
    /// Unique program ids, first-seen order
    pub programs_involved: Vec<String>,
    pub balance_status: BalanceStatus,
    pub swap_volume: Option<SwapVolume>,
    /// Token transfers made by inner instructions, in execution order
    pub inner_transfers: Vec<TokenTransfer>,
    /// One entry per account key, in key order
    pub account_roles: Vec<AccountRole>,
}

/// Normalize, classify and compute balances for raw transactions
#[derive(Debug, Clone)]
pub struct TransactionAnalyzer {
    registry: Arc<ProgramRegistry>,
    normalizer: InstructionNormalizer,
    classifier: TransactionClassifier,
    balances: BalanceDeltaCalculator,
}

impl TransactionAnalyzer {
    pub fn new(registry: Arc<ProgramRegistry>) -> Self {
        Self::with_balance_calculator(registry, BalanceDeltaCalculator::default())
    }

    pub fn with_balance_calculator(
        registry: Arc<ProgramRegistry>,
        balances: BalanceDeltaCalculator,
    ) -> Self {
        Self {
            normalizer: InstructionNormalizer::new(registry.clone()),
            classifier: TransactionClassifier::new(registry.clone()),
            registry,
            balances,
        }
    }

    pub fn analyze(&self, signature: &str, raw: &RawTransaction) -> TransactionAnalysis {
        let meta = raw.meta.as_ref();
        let account_keys = raw.account_keys();
        let raw_instructions = &raw.transaction.message.instructions;

        let instructions = self.normalizer.normalize_all(raw_instructions);
        let category = self.classifier.classify(&instructions);

        let inputs = BalanceInputs {
            account_keys: &account_keys,
            pre_balances: meta.and_then(|m| m.pre_balances.as_deref()),
            post_balances: meta.and_then(|m| m.post_balances.as_deref()),
            pre_token_balances: meta
                .and_then(|m| m.pre_token_balances.as_deref())
                .unwrap_or_default(),
            post_token_balances: meta
                .and_then(|m| m.post_token_balances.as_deref())
                .unwrap_or_default(),
        };
        let deltas = self.balances.compute(&inputs, category);
        let token_balances: Vec<&RawTokenBalance> = inputs
            .pre_token_balances
            .iter()
            .chain(inputs.post_token_balances)
            .collect();

        let inner_transfers = self.inner_transfers(meta, &account_keys, &token_balances);
        let account_roles = self.account_roles(raw, &account_keys, &token_balances);

        let mut programs_involved: Vec<String> = Vec::new();
        for ix in &instructions {
            if !programs_involved.contains(&ix.program_id) {
                programs_involved.push(ix.program_id.clone());
            }
        }

        let record = TransactionRecord {
            signature: signature.to_string(),
            block_time: raw.block_time,
            fee_native: meta.map(|m| m.fee).unwrap_or(0) as f64 / LAMPORTS_PER_SOL,
            // No metadata means no recorded error
            succeeded: meta.map_or(true, |m| m.err.is_none()),
            category,
            instructions,
            balances: deltas.snapshots,
        };

        TransactionAnalysis {
            record,
            slot: raw.slot,
            compute_units: meta.and_then(|m| m.compute_units_consumed),
            signers: raw.signers(),
            programs_involved,
            balance_status: deltas.status,
            swap_volume: deltas.swap_volume,
            inner_transfers,
            account_roles,
        }
    }

    fn inner_transfers(
        &self,
        meta: Option<&RawMeta>,
        account_keys: &[String],
        token_balances: &[&RawTokenBalance],
    ) -> Vec<TokenTransfer> {
        let Some(groups) = meta.and_then(|m| m.inner_instructions.as_deref()) else {
            return Vec::new();
        };

        let mut transfers = Vec::new();
        for group in groups {
            for ix in &group.instructions {
                let record = self.normalizer.normalize(ix);
                let Some(mut transfer) = TokenTransfer::from_record(group.index, &record) else {
                    continue;
                };

                // Plain `transfer` names no mint; take it from the token balances
                if transfer.mint.is_none() {
                    let balance = token_balances.iter().find(|b| {
                        account_keys.get(b.account_index).is_some_and(|key| {
                            Some(key) == transfer.source.as_ref()
                                || Some(key) == transfer.destination.as_ref()
                        })
                    });
                    if let Some(balance) = balance {
                        transfer.mint = Some(balance.mint.clone());
                        if let (Some(decimals), Ok(amount)) = (
                            balance.ui_token_amount.decimals,
                            transfer.amount.parse::<u128>(),
                        ) {
                            transfer.ui_amount =
                                Some(amount as f64 / 10f64.powi(i32::from(decimals)));
                        }
                    }
                }

                transfers.push(transfer);
            }
        }
        transfers
    }

    fn account_roles(
        &self,
        raw: &RawTransaction,
        account_keys: &[String],
        token_balances: &[&RawTokenBalance],
    ) -> Vec<AccountRole> {
        let signers = raw.signers();

        account_keys
            .iter()
            .enumerate()
            .map(|(index, address)| {
                let role = if let Some(label) = self.registry.program_label(address) {
                    label
                } else if address.starts_with("Sysvar") {
                    "Sysvar".to_string()
                } else if index == 0 {
                    "Fee Payer".to_string()
                } else if token_balances.iter().any(|b| &b.mint == address) {
                    "Token Mint".to_string()
                } else if token_balances.iter().any(|b| b.account_index == index) {
                    "Token Account".to_string()
                } else if signers.contains(address) {
                    "Signer".to_string()
                } else {
                    format!("Account {}", index)
                };

                AccountRole {
                    index,
                    address: address.clone(),
                    role,
                }
            })
            .collect()
    }

    /// Analyze and keep only the record
    pub fn record(&self, signature: &str, raw: &RawTransaction) -> TransactionRecord {
        self.analyze(signature, raw).record
    }
}
