//! Transaction classification
//!
//! Assigns one [`TransactionCategory`] to a transaction from its normalized
//! instructions. Rules are evaluated in a fixed order and the first match
//! wins: program-identifier matches against the registry come before the
//! looser instruction-type checks, so a swap routed through a token
//! transfer still classifies as a swap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::instruction::{InstructionRecord, MEMO_TYPE};
use crate::programs::{ProgramRegistry, PUMPFUN_FAMILY};

/// Instruction types that mark a plain SOL or token transfer
pub const TRANSFER_TYPES: [&str; 3] = ["transfer", "transferChecked", "Transfer"];

/// Semantic category of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Transfer,
    Swap,
    Memo,
    Pumpfun,
    Nft,
    Unknown,
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionCategory::Transfer => "transfer",
            TransactionCategory::Swap => "swap",
            TransactionCategory::Memo => "memo",
            TransactionCategory::Pumpfun => "pumpfun",
            TransactionCategory::Nft => "nft",
            TransactionCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule-ordered transaction classifier
#[derive(Debug, Clone)]
pub struct TransactionClassifier {
    registry: Arc<ProgramRegistry>,
}

impl TransactionClassifier {
    pub fn new(registry: Arc<ProgramRegistry>) -> Self {
        Self { registry }
    }

    /// Classify a transaction from its instructions
    pub fn classify(&self, instructions: &[InstructionRecord]) -> TransactionCategory {
        if instructions.iter().any(|ix| self.is_swap(ix)) {
            return TransactionCategory::Swap;
        }

        if instructions.iter().any(|ix| self.is_nft(ix)) {
            return TransactionCategory::Nft;
        }

        if instructions.iter().any(|ix| self.is_pumpfun(ix)) {
            return TransactionCategory::Pumpfun;
        }

        // A memo alongside anything else is not a memo transaction
        if instructions.len() == 1 && self.is_memo(&instructions[0]) {
            return TransactionCategory::Memo;
        }

        if instructions
            .iter()
            .any(|ix| TRANSFER_TYPES.contains(&ix.instruction_type.as_str()))
        {
            return TransactionCategory::Transfer;
        }

        TransactionCategory::Unknown
    }

    fn is_swap(&self, ix: &InstructionRecord) -> bool {
        // Substring match is case-sensitive: "swap" but not "Swap" inside a word
        self.registry.is_dex(&ix.program_id)
            || ix.instruction_type == "Swap"
            || ix.instruction_type.contains("swap")
    }

    fn is_nft(&self, ix: &InstructionRecord) -> bool {
        self.registry.is_nft(&ix.program_id) || ix.instruction_type.contains("NFT")
    }

    fn is_pumpfun(&self, ix: &InstructionRecord) -> bool {
        self.registry.is_bonding_curve(&ix.program_id) || ix.instruction_type == PUMPFUN_FAMILY
    }

    fn is_memo(&self, ix: &InstructionRecord) -> bool {
        self.registry.is_memo(&ix.program_id) || ix.instruction_type == MEMO_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{InstructionPayload, ProgramFamily};
    use crate::programs::{
        MEMO_PROGRAM_ID, PUMP_BONDING_CURVE_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
    };
    use serde_json::Map;

    const JUPITER: &str = "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB";
    const METAPLEX: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";
    const OTHER: &str = "ComputeBudget111111111111111111111111111111";

    fn classifier() -> TransactionClassifier {
        TransactionClassifier::new(Arc::new(ProgramRegistry::default()))
    }

    fn ix(program_id: &str, instruction_type: &str) -> InstructionRecord {
        InstructionRecord::new(
            program_id,
            ProgramFamily::Unknown,
            instruction_type,
            InstructionPayload::System { info: Map::new() },
        )
    }

    #[test]
    fn test_single_transfer() {
        for ty in TRANSFER_TYPES {
            let category = classifier().classify(&[ix(SYSTEM_PROGRAM_ID, ty)]);
            assert_eq!(category, TransactionCategory::Transfer, "type {}", ty);
        }
    }

    #[test]
    fn test_single_memo() {
        let category = classifier().classify(&[ix(MEMO_PROGRAM_ID, "Memo")]);
        assert_eq!(category, TransactionCategory::Memo);

        // Memo type from an unlisted program still counts
        let category = classifier().classify(&[ix(OTHER, "Memo")]);
        assert_eq!(category, TransactionCategory::Memo);
    }

    #[test]
    fn test_memo_with_other_instruction_is_not_memo() {
        let memo = ix(MEMO_PROGRAM_ID, "Memo");

        let category = classifier().classify(&[memo.clone(), ix(OTHER, "Unknown")]);
        assert_eq!(category, TransactionCategory::Unknown);

        let category = classifier().classify(&[memo, ix(SYSTEM_PROGRAM_ID, "transfer")]);
        assert_eq!(category, TransactionCategory::Transfer);
    }

    #[test]
    fn test_swap_by_program_beats_transfer() {
        let category = classifier().classify(&[
            ix(TOKEN_PROGRAM_ID, "transferChecked"),
            ix(JUPITER, "jupiter"),
        ]);
        assert_eq!(category, TransactionCategory::Swap);
    }

    #[test]
    fn test_swap_by_type() {
        assert_eq!(
            classifier().classify(&[ix(OTHER, "Swap")]),
            TransactionCategory::Swap
        );
        assert_eq!(
            classifier().classify(&[ix(OTHER, "swapBaseIn")]),
            TransactionCategory::Swap
        );
        // Case-sensitive substring: "SwapExactIn" only contains "Swap"
        assert_eq!(
            classifier().classify(&[ix(OTHER, "SwapExactIn")]),
            TransactionCategory::Unknown
        );
    }

    #[test]
    fn test_nft_before_pumpfun() {
        let category = classifier().classify(&[
            ix(PUMP_BONDING_CURVE_PROGRAM_ID, "pumpfun"),
            ix(METAPLEX, "Unknown"),
        ]);
        assert_eq!(category, TransactionCategory::Nft);

        let category = classifier().classify(&[ix(OTHER, "mintNFT")]);
        assert_eq!(category, TransactionCategory::Nft);
    }

    #[test]
    fn test_pumpfun() {
        let category = classifier().classify(&[
            ix(OTHER, "Unknown"),
            ix(PUMP_BONDING_CURVE_PROGRAM_ID, "pumpfun"),
            ix(SYSTEM_PROGRAM_ID, "transfer"),
        ]);
        assert_eq!(category, TransactionCategory::Pumpfun);
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(classifier().classify(&[]), TransactionCategory::Unknown);
        assert_eq!(
            classifier().classify(&[ix(OTHER, "createAccount")]),
            TransactionCategory::Unknown
        );
    }

    #[test]
    fn test_registry_is_injectable() {
        let registry = ProgramRegistry::empty().with_dex("custom", OTHER);
        let classifier = TransactionClassifier::new(Arc::new(registry));
        assert_eq!(
            classifier.classify(&[ix(OTHER, "Unknown")]),
            TransactionCategory::Swap
        );
        // Jupiter is not in the empty registry
        assert_eq!(
            classifier.classify(&[ix(JUPITER, "Unknown")]),
            TransactionCategory::Unknown
        );
    }
}
