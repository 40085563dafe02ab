//! Instruction normalization
//!
//! Maps one raw instruction entry from a `jsonParsed` RPC response to a
//! uniform [`InstructionRecord`]. Normalization never fails: payloads that
//! cannot be decoded fall back to `"Unknown"` types or raw data.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::programs::ProgramRegistry;

pub const UNKNOWN_TYPE: &str = "Unknown";
pub const UNKNOWN_SYSTEM_TYPE: &str = "Unknown System";
pub const UNKNOWN_TOKEN_TYPE: &str = "Unknown Token";
pub const MEMO_TYPE: &str = "Memo";

/// One instruction as returned by the RPC node
///
/// Parsed instructions carry `program` + `parsed`, unparsed ones carry
/// `data` + `accounts`. Every field is optional so that malformed entries
/// still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstruction {
    #[serde(default)]
    pub program_id: Option<String>,
    /// Program name assigned by the node's parser (`"system"`, `"spl-token"`, ...)
    #[serde(default)]
    pub program: Option<String>,
    /// `{type, info}` object, or a bare string for memo instructions
    #[serde(default)]
    pub parsed: Option<Value>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub accounts: Option<Vec<String>>,
    #[serde(default)]
    pub stack_height: Option<u32>,
}

impl RawInstruction {
    /// Program identifier, falling back to the parsed program name
    pub fn program_key(&self) -> &str {
        self.program_id
            .as_deref()
            .or(self.program.as_deref())
            .unwrap_or("unknown")
    }

    fn parsed_type(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("type")?.as_str()
    }

    fn parsed_info(&self) -> Map<String, Value> {
        self.parsed
            .as_ref()
            .and_then(|p| p.get("info"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

/// Coarse program family of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramFamily {
    System,
    Token,
    Memo,
    SwapProgram,
    Unknown,
}

impl ProgramFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramFamily::System => "system",
            ProgramFamily::Token => "token",
            ProgramFamily::Memo => "memo",
            ProgramFamily::SwapProgram => "swap-program",
            ProgramFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProgramFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded instruction arguments, one variant per program family
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstructionPayload {
    /// `parsed.info` of a system program instruction (empty if absent)
    System { info: Map<String, Value> },
    /// `parsed.info` of a token program instruction (empty if absent)
    Token { info: Map<String, Value> },
    Memo {
        /// UTF-8 memo text
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Encoded data that could not be decoded as UTF-8 text
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
    },
    /// Instruction of a known DEX / bonding-curve program
    Swap {
        family: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<Value>,
    },
    /// Program not in any table; the raw `parsed` / `data` is kept as-is
    Unrecognized {
        #[serde(skip_serializing_if = "Option::is_none")]
        raw: Option<Value>,
    },
}

impl InstructionPayload {
    /// Memo text, if this is a decoded memo
    pub fn message(&self) -> Option<&str> {
        match self {
            InstructionPayload::Memo { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Undecodable memo data
    pub fn raw_memo(&self) -> Option<&str> {
        match self {
            InstructionPayload::Memo { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }

    /// Parsed `info` map of a system or token instruction
    pub fn info(&self) -> Option<&Map<String, Value>> {
        match self {
            InstructionPayload::System { info } | InstructionPayload::Token { info } => Some(info),
            _ => None,
        }
    }

    /// Look up one decoded argument
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.info()?.get(key)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            InstructionPayload::System { info } | InstructionPayload::Token { info } => {
                info.is_empty()
            }
            InstructionPayload::Memo { message, raw } => message.is_none() && raw.is_none(),
            InstructionPayload::Swap { raw, .. } | InstructionPayload::Unrecognized { raw } => {
                raw.is_none()
            }
        }
    }
}

/// One decoded instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionRecord {
    pub program_id: String,
    pub family: ProgramFamily,
    pub instruction_type: String,
    pub payload: InstructionPayload,
}

impl InstructionRecord {
    pub fn new(
        program_id: impl Into<String>,
        family: ProgramFamily,
        instruction_type: impl Into<String>,
        payload: InstructionPayload,
    ) -> Self {
        Self {
            program_id: program_id.into(),
            family,
            instruction_type: instruction_type.into(),
            payload,
        }
    }
}

/// Normalizes raw instructions against a program registry
#[derive(Debug, Clone)]
pub struct InstructionNormalizer {
    registry: Arc<ProgramRegistry>,
}

impl InstructionNormalizer {
    pub fn new(registry: Arc<ProgramRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    /// Normalize one instruction
    pub fn normalize(&self, raw: &RawInstruction) -> InstructionRecord {
        let program_id = raw.program_key().to_string();
        let parsed_name = raw.program.as_deref();

        if self.registry.is_system(&program_id, parsed_name) {
            return InstructionRecord::new(
                program_id,
                ProgramFamily::System,
                raw.parsed_type().unwrap_or(UNKNOWN_SYSTEM_TYPE),
                InstructionPayload::System {
                    info: raw.parsed_info(),
                },
            );
        }

        if self.registry.is_token(&program_id, parsed_name) {
            return InstructionRecord::new(
                program_id,
                ProgramFamily::Token,
                raw.parsed_type().unwrap_or(UNKNOWN_TOKEN_TYPE),
                InstructionPayload::Token {
                    info: raw.parsed_info(),
                },
            );
        }

        if self.registry.is_memo(&program_id) {
            return InstructionRecord::new(
                program_id,
                ProgramFamily::Memo,
                MEMO_TYPE,
                decode_memo(raw),
            );
        }

        if let Some(family) = self.registry.swap_family(&program_id) {
            let family = family.to_string();
            return InstructionRecord::new(
                program_id,
                ProgramFamily::SwapProgram,
                family.clone(),
                InstructionPayload::Swap {
                    family,
                    raw: raw_value(raw),
                },
            );
        }

        InstructionRecord::new(
            program_id,
            ProgramFamily::Unknown,
            UNKNOWN_TYPE,
            InstructionPayload::Unrecognized {
                raw: raw_value(raw),
            },
        )
    }

    /// Normalize a transaction's instruction list, preserving order
    pub fn normalize_all(&self, raw: &[RawInstruction]) -> Vec<InstructionRecord> {
        raw.iter().map(|ix| self.normalize(ix)).collect()
    }
}

/// Decode memo text from a `jsonParsed` string or base64 `data`
fn decode_memo(raw: &RawInstruction) -> InstructionPayload {
    if let Some(Value::String(text)) = &raw.parsed {
        return InstructionPayload::Memo {
            message: Some(text.clone()),
            raw: None,
        };
    }

    let Some(data) = raw.data.as_deref() else {
        return InstructionPayload::Memo {
            message: None,
            raw: None,
        };
    };

    let decoded = STANDARD
        .decode(data)
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()));

    match decoded {
        Ok(message) => InstructionPayload::Memo {
            message: Some(message),
            raw: None,
        },
        Err(e) => {
            debug!("Memo data is not base64 UTF-8 ({}), keeping raw", e);
            InstructionPayload::Memo {
                message: None,
                raw: Some(data.to_string()),
            }
        }
    }
}

fn raw_value(raw: &RawInstruction) -> Option<Value> {
    raw.parsed
        .clone()
        .or_else(|| raw.data.as_ref().map(|d| Value::String(d.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{MEMO_PROGRAM_ID, PUMP_BONDING_CURVE_PROGRAM_ID, SYSTEM_PROGRAM_ID};
    use serde_json::json;

    fn normalizer() -> InstructionNormalizer {
        InstructionNormalizer::new(Arc::new(ProgramRegistry::default()))
    }

    fn raw(value: Value) -> RawInstruction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_system_transfer() {
        let ix = raw(json!({
            "program": "system",
            "programId": SYSTEM_PROGRAM_ID,
            "parsed": {
                "type": "transfer",
                "info": {"source": "A", "destination": "B", "lamports": 5000}
            }
        }));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.family, ProgramFamily::System);
        assert_eq!(record.instruction_type, "transfer");
        assert_eq!(record.payload.field("lamports"), Some(&json!(5000)));
    }

    #[test]
    fn test_system_without_parsed_type() {
        let ix = raw(json!({"program": "system", "programId": SYSTEM_PROGRAM_ID}));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.instruction_type, UNKNOWN_SYSTEM_TYPE);
        assert!(record.payload.is_empty());
    }

    #[test]
    fn test_token_fallback_type() {
        let ix = raw(json!({
            "program": "spl-token",
            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "parsed": {"info": {"amount": "10"}}
        }));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.family, ProgramFamily::Token);
        assert_eq!(record.instruction_type, UNKNOWN_TOKEN_TYPE);
        assert_eq!(record.payload.field("amount"), Some(&json!("10")));
    }

    #[test]
    fn test_memo_base64_data() {
        let ix = raw(json!({"programId": MEMO_PROGRAM_ID, "data": "aGVsbG8="}));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.family, ProgramFamily::Memo);
        assert_eq!(record.instruction_type, "Memo");
        assert_eq!(record.payload.message(), Some("hello"));
    }

    #[test]
    fn test_memo_parsed_string() {
        let ix = raw(json!({
            "program": "spl-memo",
            "programId": MEMO_PROGRAM_ID,
            "parsed": "gm"
        }));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.payload.message(), Some("gm"));
    }

    #[test]
    fn test_memo_undecodable_keeps_raw() {
        let ix = raw(json!({"programId": MEMO_PROGRAM_ID, "data": "%%%not base64%%%"}));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.instruction_type, "Memo");
        assert_eq!(record.payload.message(), None);
        assert_eq!(record.payload.raw_memo(), Some("%%%not base64%%%"));
    }

    #[test]
    fn test_memo_invalid_utf8_keeps_raw() {
        // 0xff 0xfe is valid base64 but not UTF-8
        let ix = raw(json!({"programId": MEMO_PROGRAM_ID, "data": "//4="}));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.payload.raw_memo(), Some("//4="));
    }

    #[test]
    fn test_pumpfun_program() {
        let ix = raw(json!({
            "programId": PUMP_BONDING_CURVE_PROGRAM_ID,
            "data": "AJTQ2h9DXrBx",
            "accounts": ["A", "B"]
        }));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.family, ProgramFamily::SwapProgram);
        assert_eq!(record.instruction_type, "pumpfun");
        assert_eq!(
            record.payload,
            InstructionPayload::Swap {
                family: "pumpfun".to_string(),
                raw: Some(json!("AJTQ2h9DXrBx")),
            }
        );
    }

    #[test]
    fn test_unknown_program_keeps_raw() {
        let ix = raw(json!({"programId": "ComputeBudget111111111111111111111111111111", "data": "3DTZbgwsozUF"}));
        let record = normalizer().normalize(&ix);
        assert_eq!(record.family, ProgramFamily::Unknown);
        assert_eq!(record.instruction_type, UNKNOWN_TYPE);
        assert_eq!(
            record.payload,
            InstructionPayload::Unrecognized {
                raw: Some(json!("3DTZbgwsozUF"))
            }
        );
    }

    #[test]
    fn test_missing_program_id() {
        let record = normalizer().normalize(&RawInstruction::default());
        assert_eq!(record.program_id, "unknown");
        assert_eq!(record.instruction_type, UNKNOWN_TYPE);
    }

    #[test]
    fn test_payload_serializes_tagged() {
        let payload = InstructionPayload::Memo {
            message: Some("hi".into()),
            raw: None,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"kind": "memo", "message": "hi"})
        );
    }
}
