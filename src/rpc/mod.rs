//! JSON-RPC transaction source
//!
//! Implements [`TransactionSource`] against a Solana RPC node:
//! - `getSignaturesForAddress` with a `before` cursor for paging
//! - `getTransaction` in `jsonParsed` encoding
//!
//! Transient failures are retried with exponential backoff here; the
//! analysis code above never retries.

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::RpcConfig;
use crate::error::{Error, Result};
use crate::transaction::RawTransaction;
use crate::wallet::{SignatureCounter, SignatureInfo, TransactionSource};

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<Option<T>> {
        match self.error {
            Some(error) => Err(Error::RpcResponse {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result),
        }
    }
}

/// Solana JSON-RPC client
pub struct RpcTransactionSource {
    client: Client,
    endpoint: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    page_size: usize,
}

impl RpcTransactionSource {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rpc(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            page_size: config.page_size.max(1),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// One page of signatures, newest first
    pub async fn signatures_page(
        &self,
        address: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<SignatureInfo>> {
        let params = signatures_params(address, limit, before);
        let page: Option<Vec<SignatureInfo>> = self.call("getSignaturesForAddress", &params).await?;
        Ok(page.unwrap_or_default())
    }

    /// Call with retry on transient errors
    async fn call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<Option<T>> {
        let backoff = ExponentialBackoff {
            initial_interval: self.retry_base_delay,
            max_interval: self.retry_base_delay * 8,
            max_elapsed_time: Some(self.timeout * (self.max_retries + 1)),
            ..Default::default()
        };
        let attempts = AtomicU32::new(0);

        retry(backoff, || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            match self.call_once(method, params).await {
                Ok(result) => Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!("Retryable RPC error on {} (attempt {}): {}", method, attempt + 1, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => {
                    error!("RPC {} failed: {}", method, e);
                    Err(backoff::Error::permanent(e))
                }
            }
        })
        .await
    }

    /// Single request (no retry)
    async fn call_once<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<Option<T>> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::RpcTimeout(self.timeout.as_millis() as u64)
                } else {
                    Error::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                Error::Rpc(format!("RPC HTTP {}: {}", status, body))
            } else {
                Error::RpcResponse {
                    code: status.as_u16() as i64,
                    message: body,
                }
            });
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("Failed to parse {} response: {}", method, e)))?;

        body.into_result()
    }
}

fn signatures_params(address: &str, limit: usize, before: Option<&str>) -> Value {
    let mut options = json!({ "limit": limit });
    if let Some(before) = before {
        options["before"] = json!(before);
    }
    json!([address, options])
}

fn transaction_params(signature: &str) -> Value {
    json!([
        signature,
        {
            "encoding": "jsonParsed",
            "maxSupportedTransactionVersion": 0,
            "commitment": "confirmed"
        }
    ])
}

#[async_trait]
impl SignatureCounter for RpcTransactionSource {
    /// Pages through the full history; stops on the first short page
    async fn count_successful_signatures(&self, address: &str) -> Result<u64> {
        let mut total = 0u64;
        let mut pages = 0u32;
        let mut before: Option<String> = None;

        loop {
            let page = self
                .signatures_page(address, self.page_size, before.as_deref())
                .await?;
            pages += 1;
            total += page.iter().filter(|s| s.is_success()).count() as u64;

            debug!(
                "Signature page {} for {}: {} entries, {} successful so far",
                pages,
                address,
                page.len(),
                total
            );

            if page.len() < self.page_size {
                break;
            }
            before = page.last().map(|s| s.signature.clone());
        }

        info!("Counted {} successful signatures for {} over {} pages", total, address, pages);
        Ok(total)
    }
}

#[async_trait]
impl TransactionSource for RpcTransactionSource {
    async fn recent_signatures(&self, address: &str, limit: usize) -> Result<Vec<SignatureInfo>> {
        let mut signatures: Vec<SignatureInfo> = Vec::with_capacity(limit);

        while signatures.len() < limit {
            let want = (limit - signatures.len()).min(self.page_size);
            let before = signatures.last().map(|s| s.signature.as_str());
            let page = self.signatures_page(address, want, before).await?;
            let short = page.len() < want;
            signatures.extend(page);
            if short {
                break;
            }
        }

        Ok(signatures)
    }

    async fn transaction(&self, signature: &str) -> Result<Option<RawTransaction>> {
        debug!("Fetching transaction {}", signature);
        self.call("getTransaction", &transaction_params(signature)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures_params() {
        let params = signatures_params("Addr", 1000, None);
        assert_eq!(params, json!(["Addr", {"limit": 1000}]));

        let params = signatures_params("Addr", 20, Some("lastSig"));
        assert_eq!(params[1]["before"], "lastSig");
        assert_eq!(params[1]["limit"], 20);
    }

    #[test]
    fn test_transaction_params() {
        let params = transaction_params("sig");
        assert_eq!(params[0], "sig");
        assert_eq!(params[1]["encoding"], "jsonParsed");
        assert_eq!(params[1]["maxSupportedTransactionVersion"], 0);
    }

    #[test]
    fn test_response_with_result() {
        let body: RpcResponse<Vec<SignatureInfo>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":[
                {"signature":"s1","slot":10,"err":null,"memo":null,"blockTime":1700000000,"confirmationStatus":"finalized"},
                {"signature":"s2","slot":9,"err":{"InstructionError":[0,"Custom"]},"memo":null,"blockTime":null,"confirmationStatus":"finalized"}
            ]}"#,
        )
        .unwrap();

        let page = body.into_result().unwrap().unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].is_success());
        assert_eq!(page[0].block_time, Some(1_700_000_000));
        assert!(!page[1].is_success());
        assert_eq!(page[1].block_time, None);
    }

    #[test]
    fn test_null_result_is_none() {
        let body: RpcResponse<RawTransaction> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(body.into_result().unwrap().is_none());
    }

    #[test]
    fn test_error_response() {
        let body: RpcResponse<Value> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"Node is behind"}}"#,
        )
        .unwrap();

        let err = body.into_result().unwrap_err();
        assert!(matches!(err, Error::RpcResponse { code: -32005, .. }));
        assert!(err.is_retryable());
    }

    /// Decodes the envelope through the same generic path as `call_once`
    fn decode<T: DeserializeOwned>(body: &str) -> Result<Option<T>> {
        serde_json::from_str::<RpcResponse<T>>(body)
            .map_err(|e| Error::Deserialization(e.to_string()))?
            .into_result()
    }

    #[test]
    fn test_envelope_without_default_result_type() {
        // SignatureInfo has no Default impl
        let count: Option<u64> = decode(r#"{"jsonrpc":"2.0","id":1,"result":7}"#).unwrap();
        assert_eq!(count, Some(7));

        let missing: Option<SignatureInfo> = decode(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(missing.is_none());

        let err = decode::<SignatureInfo>(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::RpcResponse { code: -32602, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_new_from_config() {
        let config = RpcConfig {
            page_size: 0,
            ..Default::default()
        };
        let source = RpcTransactionSource::new(&config).unwrap();
        assert_eq!(source.page_size(), 1);
        assert_eq!(source.max_retries, 3);
    }
}
