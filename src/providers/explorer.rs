//! Block-explorer source retrieval
//!
//! Etherscan-compatible `getsourcecode` client for every supported network.
//! Verified source comes back in one of three layouts:
//! - a single Solidity blob
//! - a JSON object `{path: {content}}`
//! - standard-JSON input wrapped in an extra pair of braces (`{{ ... }}`)
//!
//! Multi-file layouts are flattened with forge before classification.

use alloy_primitives::Address;
use async_trait::async_trait;
use eyre::{eyre, Result};
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::traits::SourceProvider;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::providers::forge::ForgeRunner;
use crate::utils::constants::{
    get_chain_name, get_explorer_api_url, get_explorer_key_env, SUPPORTED_CHAIN_IDS,
    USER_AGENT as USER_AGENT_CONST,
};

/// Verified source in the layout the explorer returned it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceBundle {
    Single(String),
    /// Relative path -> file contents
    Files(IndexMap<String, String>),
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StandardJsonInput {
    sources: IndexMap<String, FileEntry>,
}

impl SourceBundle {
    /// Parse an explorer `SourceCode` field; `Ok(None)` for unverified contracts
    pub fn parse(raw: &str) -> AppResult<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let files: IndexMap<String, FileEntry> = if raw.starts_with("{{") && raw.ends_with("}}") {
            let inner = &raw[1..raw.len() - 1];
            serde_json::from_str::<StandardJsonInput>(inner)
                .map_err(|e| malformed(format!("standard-json input: {}", e)))?
                .sources
        } else if raw.starts_with('{') {
            serde_json::from_str(raw).map_err(|e| malformed(format!("multi-file source: {}", e)))?
        } else {
            return Ok(Some(SourceBundle::Single(raw.to_string())));
        };

        if files.is_empty() {
            return Err(malformed("multi-file source without files"));
        }

        Ok(Some(SourceBundle::Files(
            files.into_iter().map(|(path, file)| (path, file.content)).collect(),
        )))
    }
}

fn malformed(msg: impl Into<String>) -> AppError {
    AppError::new(ErrorCode::MalformedSourceBundle, msg)
}

/// Explorer API response envelope
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    message: String,
    result: Value,
}

/// Etherscan-family API client
pub struct ExplorerClient {
    client: reqwest::Client,
    api_keys: HashMap<u64, String>,
}

impl ExplorerClient {
    /// Build a client with per-network keys and an optional HTTPS proxy
    pub fn new(api_keys: HashMap<u64, String>, proxy: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true);
        if let Some(proxy) = proxy {
            builder = builder.proxy(
                reqwest::Proxy::https(proxy).map_err(|e| eyre!("Invalid proxy {}: {}", proxy, e))?,
            );
            info!("🌐 Explorer requests routed through proxy");
        }

        let client = builder
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self { client, api_keys })
    }

    /// Networks with a configured key
    pub fn configured_networks(&self) -> Vec<u64> {
        SUPPORTED_CHAIN_IDS
            .into_iter()
            .filter(|id| self.api_keys.contains_key(id))
            .collect()
    }

    /// Raw `SourceCode` field for `address`
    pub async fn get_source_code(&self, chain_id: u64, address: Address) -> AppResult<String> {
        let base = get_explorer_api_url(chain_id)
            .ok_or_else(|| AppError::unsupported_network(chain_id))?;
        let key = self.api_keys.get(&chain_id).ok_or_else(|| {
            AppError::missing_api_key(get_explorer_key_env(chain_id).unwrap_or("EXPLORER_API_KEY"))
        })?;

        debug!("🔍 Fetching source of {} from {}", address, get_chain_name(chain_id));
        let address_hex = address.to_string();

        let response = self
            .client
            .get(base)
            .query(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address_hex.as_str()),
                ("apikey", key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::explorer(format!("HTTP error: {}", status)));
        }

        let body: ExplorerResponse = response.json().await?;
        extract_source_code(body)
    }
}

fn extract_source_code(body: ExplorerResponse) -> AppResult<String> {
    match body.result {
        Value::Array(entries) => Ok(entries
            .first()
            .and_then(|entry| entry.get("SourceCode"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()),
        Value::String(reason) => Err(AppError::explorer(format!("{}: {}", body.message, reason))),
        other => Err(AppError::explorer(format!("unexpected result: {}", other))),
    }
}

/// Explorer retrieval plus forge flattening for multi-file sources
pub struct ExplorerSourceProvider {
    explorer: ExplorerClient,
    forge: Arc<ForgeRunner>,
}

impl ExplorerSourceProvider {
    pub fn new(explorer: ExplorerClient, forge: Arc<ForgeRunner>) -> Self {
        Self { explorer, forge }
    }
}

#[async_trait]
impl SourceProvider for ExplorerSourceProvider {
    async fn fetch_source(&self, chain_id: u64, address: Address) -> AppResult<Option<String>> {
        let raw = self.explorer.get_source_code(chain_id, address).await?;
        match SourceBundle::parse(&raw)? {
            None => Ok(None),
            Some(SourceBundle::Single(source)) => Ok(Some(source)),
            Some(SourceBundle::Files(files)) => {
                debug!("📚 Flattening {} files for {}", files.len(), address);
                self.forge.flatten(&files).await.map(Some)
            }
        }
    }
}
