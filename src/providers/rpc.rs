//! RPC Client Module - JSON-RPC over HTTP
//!
//! 1. Exponential backoff retry with jitter (500ms→1s→2s→4s, capped)
//! 2. Optional fallback endpoint
//! 3. Gzip compression and User-Agent header
//! 4. Typed block/transaction decoding into `TxEvent`s
//!
//! Uses constants from utils/constants.rs

use alloy_primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::traits::ChainReader;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::TxEvent;
use crate::utils::constants::{
    get_chain_name, RETRY_JITTER_PERCENT, RPC_BASE_RETRY_MS, RPC_MAX_RETRIES, RPC_MAX_RETRY_MS,
    USER_AGENT as USER_AGENT_CONST,
};

/// Prefix of every rate-limit error, HTTP or JSON-RPC
const RATE_LIMITED: &str = "Rate limited";

/// Backoff before retry `attempt` (1-based), without jitter
pub fn backoff_delay_ms(attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    (RPC_BASE_RETRY_MS * 2_u64.pow(exponent)).min(RPC_MAX_RETRY_MS)
}

fn jittered(delay_ms: u64) -> u64 {
    let jitter_range = (delay_ms * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 =
        rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (delay_ms as i64 + jitter).max(100) as u64
}

/// JSON-RPC client with retry and fallback
#[derive(Clone)]
pub struct RpcProvider {
    primary_url: String,
    fallback_url: Option<String>,
    client: reqwest::Client,
    chain_id: u64,
}

impl RpcProvider {
    /// Create a provider for `url` on `chain_id`
    pub fn new(url: impl Into<String>, chain_id: u64, timeout: Duration) -> Result<Self> {
        let primary_url = url.into();
        if primary_url.is_empty() {
            return Err(eyre!("RPC URL is empty"));
        }
        Ok(Self {
            primary_url,
            fallback_url: None,
            client: Self::build_client(timeout)?,
            chain_id,
        })
    }

    pub fn with_fallback(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }

    fn build_client(timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Execute JSON-RPC call with retry logic and fallback
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) => warn!("⚠️ Primary RPC failed for {}: {}", method, e),
        }

        if let Some(ref fallback) = self.fallback_url {
            info!("🔄 Trying fallback RPC for {}", method);
            match self.call_with_retry(fallback, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) => warn!("⚠️ Fallback RPC also failed: {}", e),
            }
        }

        Err(eyre!(
            "All RPC endpoints failed for {} on {}",
            method,
            get_chain_name(self.chain_id)
        ))
    }

    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..RPC_MAX_RETRIES {
            if attempt > 0 {
                let base = backoff_delay_ms(attempt);
                let delay = jittered(base);
                debug!(
                    "⏳ Retry {}/{} after {}ms (base: {}ms)",
                    attempt + 1,
                    RPC_MAX_RETRIES,
                    delay,
                    base
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.to_string().starts_with(RATE_LIMITED) {
                        warn!(
                            "⏳ Rate limited, backing off (attempt {}/{})",
                            attempt + 1,
                            RPC_MAX_RETRIES
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| eyre!("Unknown error after {} retries", RPC_MAX_RETRIES)))
    }

    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| eyre!("Request failed: {}", e))?;

        let status = response.status();
        if status == 429 {
            return Err(eyre!("{} (HTTP 429)", RATE_LIMITED));
        }
        if !status.is_success() {
            return Err(eyre!("HTTP error: {}", status));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse response: {}", e))?;

        if let Some(error) = json.error {
            return Err(error.into_report());
        }

        json.result.ok_or_else(|| eyre!("No result in response"))
    }

    /// Latest block number
    pub async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.call("eth_blockNumber", serde_json::json!([])).await?;
        Ok(number.to::<u64>())
    }

    /// Block with full transaction objects
    pub async fn get_block_with_txs(&self, number: u64) -> Result<Option<RpcBlock>> {
        let params = serde_json::json!([format!("0x{:x}", number), true]);
        self.call::<Option<RpcBlock>>("eth_getBlockByNumber", params)
            .await
    }

    /// Runtime bytecode at the latest block
    pub async fn code_at(&self, address: Address) -> Result<Bytes> {
        let params = serde_json::json!([address, "latest"]);
        self.call::<Bytes>("eth_getCode", params).await
    }

    /// URL with any path credential masked (for logging)
    pub fn masked_url(&self) -> String {
        mask_url(&self.primary_url)
    }

    /// Primary endpoint, also used as the fork URL
    pub fn url(&self) -> &str {
        &self.primary_url
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

fn mask_url(url: &str) -> String {
    if let Some((base, _key)) = url.split_once("/v2/") {
        return format!("{}/v2/***HIDDEN***", base);
    }
    if let Some((base, _key)) = url.split_once("/v3/") {
        return format!("{}/v3/***HIDDEN***", base);
    }
    url.to_string()
}

#[async_trait]
impl ChainReader for RpcProvider {
    async fn get_code(&self, address: Address) -> AppResult<Bytes> {
        self.code_at(address)
            .await
            .map_err(|e| AppError::rpc(format!("eth_getCode {}: {}", address, e)))
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Rate limited (code -32005)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }

    /// Rate limits are reported like HTTP 429 so the retry loop backs off the same way
    fn into_report(self) -> eyre::Report {
        if self.is_rate_limit() {
            eyre!("{}: {} (code: {})", RATE_LIMITED, self.message, self.code)
        } else {
            eyre!("RPC error: {} (code: {})", self.message, self.code)
        }
    }
}

/// Transaction as returned inside `eth_getBlockByNumber(.., true)`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    pub nonce: U64,
    pub input: Bytes,
}

/// Block with full transactions
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
    pub number: U64,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

impl RpcBlock {
    /// Contract-creation transactions of this block as agent events
    pub fn creation_events(&self, chain_id: u64) -> Vec<TxEvent> {
        let block_number = self.number.to::<u64>();
        self.transactions
            .iter()
            .filter(|tx| tx.to.is_none())
            .map(|tx| TxEvent {
                network: chain_id,
                hash: tx.hash,
                from: tx.from,
                to: None,
                nonce: tx.nonce.to::<u64>(),
                input: tx.input.clone(),
                block_number,
                created_address: None,
            })
            .collect()
    }
}
