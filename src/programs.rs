//! Known on-chain program identifiers
//!
//! # WARNING: These identifiers may change without notice
//! DEX and launchpad programs are redeployed from time to time. The tables
//! here are configuration data: extend them through `[programs]` in the
//! config file rather than editing the classifier.

use std::collections::{HashMap, HashSet};

use crate::config::ProgramsConfig;
use crate::error::{Error, Result};

/// Native currency (SOL) system program
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

/// SPL Token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// SPL Token-2022 program
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

/// SPL Memo program (v2)
pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
/// SPL Memo program (v1, legacy)
pub const MEMO_V1_PROGRAM_ID: &str = "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo";

/// Pump.fun bonding curve program
pub const PUMP_BONDING_CURVE_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// Family name reported for pump.fun bonding-curve instructions
pub const PUMPFUN_FAMILY: &str = "pumpfun";

/// Program names as reported by the RPC `jsonParsed` encoding
pub const PARSED_SYSTEM_PROGRAM: &str = "system";
pub const PARSED_TOKEN_PROGRAMS: [&str; 2] = ["spl-token", "spl-token-2022"];

/// DEX / AMM programs: (family name, program id)
pub const DEX_PROGRAMS: [(&str, &str); 7] = [
    ("jupiter", "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB"),
    ("raydium", "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8"),
    ("raydium-cpmm", "CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C"),
    ("raydium-clmm", "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK"),
    ("orca", "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc"),
    ("meteora-dlmm", "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo"),
    ("pump-amm", "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA"),
];

/// NFT programs: (name, program id)
pub const NFT_PROGRAMS: [(&str, &str); 3] = [
    ("metaplex", "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s"),
    ("candy-machine", "cndy3Z4yapfJBmL3ShUp5exZKqR3z33thTzeNMm2gRZ"),
    ("auction", "auctxRXPeJoc4817jDhf4HbjnhEcr1cCXenosMhK5R8"),
];

/// Bonding-curve launchpad programs: (family name, program id)
pub const BONDING_CURVE_PROGRAMS: [(&str, &str); 1] =
    [(PUMPFUN_FAMILY, PUMP_BONDING_CURVE_PROGRAM_ID)];

/// Lookup tables of program identifiers used by the normalizer and classifier
#[derive(Debug, Clone)]
pub struct ProgramRegistry {
    system_program: String,
    token_programs: HashSet<String>,
    memo_programs: HashSet<String>,
    /// program id -> family name
    dex_programs: HashMap<String, String>,
    nft_programs: HashMap<String, String>,
    bonding_curve_programs: HashMap<String, String>,
}

impl Default for ProgramRegistry {
    fn default() -> Self {
        let owned = |table: &[(&str, &str)]| -> HashMap<String, String> {
            table
                .iter()
                .map(|(name, id)| (id.to_string(), name.to_string()))
                .collect()
        };

        Self {
            system_program: SYSTEM_PROGRAM_ID.to_string(),
            token_programs: [TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            memo_programs: [MEMO_PROGRAM_ID, MEMO_V1_PROGRAM_ID]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dex_programs: owned(&DEX_PROGRAMS),
            nft_programs: owned(&NFT_PROGRAMS),
            bonding_curve_programs: owned(&BONDING_CURVE_PROGRAMS),
        }
    }
}

impl ProgramRegistry {
    /// Registry with no swap, NFT or bonding-curve programs
    pub fn empty() -> Self {
        Self {
            dex_programs: HashMap::new(),
            nft_programs: HashMap::new(),
            bonding_curve_programs: HashMap::new(),
            ..Self::default()
        }
    }

    /// Built-in tables extended with the configured extras
    pub fn from_config(config: &ProgramsConfig) -> Result<Self> {
        let mut registry = Self::default();

        for entry in &config.dex {
            validate_address(&entry.program_id)?;
            registry = registry.with_dex(&entry.name, &entry.program_id);
        }
        for entry in &config.nft {
            validate_address(&entry.program_id)?;
            registry = registry.with_nft(&entry.name, &entry.program_id);
        }
        for entry in &config.bonding_curve {
            validate_address(&entry.program_id)?;
            registry = registry.with_bonding_curve(&entry.name, &entry.program_id);
        }
        for id in &config.memo {
            validate_address(id)?;
            registry = registry.with_memo(id);
        }

        Ok(registry)
    }

    pub fn with_dex(mut self, family: &str, program_id: &str) -> Self {
        self.dex_programs
            .insert(program_id.to_string(), family.to_string());
        self
    }

    pub fn with_nft(mut self, name: &str, program_id: &str) -> Self {
        self.nft_programs
            .insert(program_id.to_string(), name.to_string());
        self
    }

    pub fn with_bonding_curve(mut self, family: &str, program_id: &str) -> Self {
        self.bonding_curve_programs
            .insert(program_id.to_string(), family.to_string());
        self
    }

    pub fn with_memo(mut self, program_id: &str) -> Self {
        self.memo_programs.insert(program_id.to_string());
        self
    }

    /// Check a program against the system program, by id or parsed name
    pub fn is_system(&self, program_id: &str, parsed_name: Option<&str>) -> bool {
        parsed_name == Some(PARSED_SYSTEM_PROGRAM) || program_id == self.system_program
    }

    /// Check a program against the token programs, by id or parsed name
    pub fn is_token(&self, program_id: &str, parsed_name: Option<&str>) -> bool {
        parsed_name.is_some_and(|name| PARSED_TOKEN_PROGRAMS.contains(&name))
            || self.token_programs.contains(program_id)
    }

    pub fn is_memo(&self, program_id: &str) -> bool {
        self.memo_programs.contains(program_id)
    }

    pub fn is_dex(&self, program_id: &str) -> bool {
        self.dex_programs.contains_key(program_id)
    }

    pub fn is_nft(&self, program_id: &str) -> bool {
        self.nft_programs.contains_key(program_id)
    }

    pub fn is_bonding_curve(&self, program_id: &str) -> bool {
        self.bonding_curve_programs.contains_key(program_id)
    }

    /// Family name of a swap-capable program (DEX or bonding curve)
    pub fn swap_family(&self, program_id: &str) -> Option<&str> {
        self.bonding_curve_programs
            .get(program_id)
            .or_else(|| self.dex_programs.get(program_id))
            .map(String::as_str)
    }

    /// Human-readable label of a known program
    pub fn program_label(&self, program_id: &str) -> Option<String> {
        if program_id == self.system_program {
            return Some("System Program".to_string());
        }
        if self.token_programs.contains(program_id) {
            return Some("Token Program".to_string());
        }
        if self.is_memo(program_id) {
            return Some("Memo Program".to_string());
        }
        self.swap_family(program_id)
            .or_else(|| self.nft_programs.get(program_id).map(String::as_str))
            .map(|name| format!("{} program", name))
    }
}

/// Check that a string is a base58-encoded 32-byte address
pub fn is_valid_address(address: &str) -> bool {
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == 32)
}

/// Like [`is_valid_address`] but returns an error naming the address
pub fn validate_address(address: &str) -> Result<()> {
    if is_valid_address(address) {
        Ok(())
    } else {
        Err(Error::InvalidAddress(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgramEntry;

    #[test]
    fn test_default_tables() {
        let registry = ProgramRegistry::default();
        assert!(registry.is_dex("JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB"));
        assert!(registry.is_nft("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s"));
        assert!(registry.is_bonding_curve(PUMP_BONDING_CURVE_PROGRAM_ID));
        assert!(!registry.is_dex(PUMP_BONDING_CURVE_PROGRAM_ID));
        assert!(registry.is_memo(MEMO_PROGRAM_ID));
        assert!(registry.is_memo(MEMO_V1_PROGRAM_ID));
    }

    #[test]
    fn test_system_and_token_by_parsed_name() {
        let registry = ProgramRegistry::default();
        assert!(registry.is_system("whatever", Some("system")));
        assert!(registry.is_system(SYSTEM_PROGRAM_ID, None));
        assert!(registry.is_token("whatever", Some("spl-token")));
        assert!(registry.is_token(TOKEN_2022_PROGRAM_ID, None));
        assert!(!registry.is_token(SYSTEM_PROGRAM_ID, Some("system")));
    }

    #[test]
    fn test_swap_family() {
        let registry = ProgramRegistry::default();
        assert_eq!(
            registry.swap_family(PUMP_BONDING_CURVE_PROGRAM_ID),
            Some(PUMPFUN_FAMILY)
        );
        assert_eq!(
            registry.swap_family("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc"),
            Some("orca")
        );
        assert_eq!(registry.swap_family(SYSTEM_PROGRAM_ID), None);
    }

    #[test]
    fn test_from_config_extends_tables() {
        let config = ProgramsConfig {
            dex: vec![ProgramEntry {
                name: "meteora-damm-v2".to_string(),
                program_id: "cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG".to_string(),
            }],
            ..Default::default()
        };
        let registry = ProgramRegistry::from_config(&config).unwrap();
        assert!(registry.is_dex("cpamdpZCGKUy5JxQXB4dcpGPiikHawvSWAd6mEn1sGG"));
        assert!(registry.is_dex("JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB"));
    }

    #[test]
    fn test_from_config_rejects_bad_address() {
        let config = ProgramsConfig {
            memo: vec!["not-base58-0OIl".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ProgramRegistry::from_config(&config),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_program_label() {
        let registry = ProgramRegistry::default();
        assert_eq!(registry.program_label(SYSTEM_PROGRAM_ID).as_deref(), Some("System Program"));
        assert_eq!(registry.program_label(TOKEN_2022_PROGRAM_ID).as_deref(), Some("Token Program"));
        assert_eq!(
            registry.program_label(PUMP_BONDING_CURVE_PROGRAM_ID).as_deref(),
            Some("pumpfun program")
        );
        assert_eq!(
            registry.program_label("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s").as_deref(),
            Some("metaplex program")
        );
        assert_eq!(registry.program_label("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"), None);
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address(SYSTEM_PROGRAM_ID));
        assert!(is_valid_address(TOKEN_PROGRAM_ID));
        assert!(!is_valid_address("short"));
        assert!(!is_valid_address(""));
    }
}
