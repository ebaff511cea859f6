//! Configuration module for Rug Sentry
//! Everything comes from environment variables; network metadata lives in
//! utils/constants.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    get_explorer_key_env, CHAIN_ID_ETHEREUM, DEFAULT_BLOCK_POLL_SECS, DEFAULT_QUEUE_IDLE_SECS,
    DEFAULT_RPC_TIMEOUT_SECS, SUPPORTED_CHAIN_IDS,
};

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// HTTP RPC URL, used for chain reads and as the fork URL
    pub rpc_url: String,

    /// Secondary RPC URL tried after the primary exhausts its retries
    pub fallback_rpc_url: Option<String>,

    /// Chain id of the network behind `rpc_url`
    pub chain_id: u64,

    /// Explorer API keys by chain id (only networks with a key set)
    pub explorer_keys: HashMap<u64, String>,

    /// Optional outbound proxy for explorer requests
    pub https_proxy: Option<String>,

    /// forge executable
    pub forge_bin: String,

    /// Foundry project used as the verification workspace
    pub forge_project_dir: PathBuf,

    /// Idle consumer re-check interval
    pub queue_idle: Duration,

    /// Block polling interval of the binary
    pub block_poll: Duration,

    /// Timeout for RPC and explorer calls
    pub rpc_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            fallback_rpc_url: None,
            chain_id: CHAIN_ID_ETHEREUM,
            explorer_keys: HashMap::new(),
            https_proxy: None,
            forge_bin: "forge".to_string(),
            forge_project_dir: PathBuf::from("./working"),
            queue_idle: Duration::from_secs(DEFAULT_QUEUE_IDLE_SECS),
            block_poll: Duration::from_secs(DEFAULT_BLOCK_POLL_SECS),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

impl AgentConfig {
    /// Load from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let explorer_keys = SUPPORTED_CHAIN_IDS
            .into_iter()
            .filter_map(|chain_id| {
                let env = get_explorer_key_env(chain_id)?;
                get(env).map(|key| (chain_id, key))
            })
            .collect();

        Ok(Self {
            rpc_url: get("RPC_URL").unwrap_or(defaults.rpc_url),
            fallback_rpc_url: get("FALLBACK_RPC_URL"),
            chain_id: parse_or("CHAIN_ID", get("CHAIN_ID"), defaults.chain_id)?,
            explorer_keys,
            https_proxy: get("HTTPS_PROXY"),
            forge_bin: get("FORGE_BIN").unwrap_or(defaults.forge_bin),
            forge_project_dir: get("FORGE_PROJECT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.forge_project_dir),
            queue_idle: secs_or("QUEUE_IDLE_SECS", get("QUEUE_IDLE_SECS"), defaults.queue_idle)?,
            block_poll: secs_or("BLOCK_POLL_SECS", get("BLOCK_POLL_SECS"), defaults.block_poll)?,
            rpc_timeout: secs_or("RPC_TIMEOUT_SECS", get("RPC_TIMEOUT_SECS"), defaults.rpc_timeout)?,
        })
    }

    pub fn has_explorer_key(&self, chain_id: u64) -> bool {
        self.explorer_keys.contains_key(&chain_id)
    }
}

fn parse_or(key: &str, value: Option<String>, default: u64) -> AppResult<u64> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            AppError::new(
                ErrorCode::ConfigInvalidValue,
                format!("{} must be an unsigned integer, got {:?}", key, raw),
            )
        }),
    }
}

fn secs_or(key: &str, value: Option<String>, default: Duration) -> AppResult<Duration> {
    let secs = parse_or(key, value, default.as_secs())?;
    if secs == 0 {
        return Err(AppError::new(
            ErrorCode::ConfigInvalidValue,
            format!("{} must be greater than zero", key),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::CHAIN_ID_BSC;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = AgentConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.chain_id, CHAIN_ID_ETHEREUM);
        assert_eq!(config.forge_bin, "forge");
        assert_eq!(config.queue_idle, Duration::from_secs(DEFAULT_QUEUE_IDLE_SECS));
        assert!(config.explorer_keys.is_empty());
        assert!(config.https_proxy.is_none());
        assert!(config.fallback_rpc_url.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("RPC_URL", "https://bsc.example"),
            ("CHAIN_ID", "56"),
            ("BSCSCAN_API_KEY", "abc"),
            ("ETHERSCAN_API_KEY", "  "),
            ("HTTPS_PROXY", "http://proxy:3128"),
            ("QUEUE_IDLE_SECS", "3"),
            ("FALLBACK_RPC_URL", "https://bsc-backup.example"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "https://bsc.example");
        assert_eq!(config.chain_id, CHAIN_ID_BSC);
        assert!(config.has_explorer_key(CHAIN_ID_BSC));
        assert!(!config.has_explorer_key(CHAIN_ID_ETHEREUM));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.queue_idle, Duration::from_secs(3));
        assert_eq!(config.fallback_rpc_url.as_deref(), Some("https://bsc-backup.example"));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = AgentConfig::from_lookup(lookup(&[("CHAIN_ID", "mainnet")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        let err = AgentConfig::from_lookup(lookup(&[("BLOCK_POLL_SECS", "0")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }
}
