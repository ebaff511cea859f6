//! Constants Module - Single Source of Truth
//!
//! Network metadata, classifier signature lists, harness constants and the
//! alert identifiers all live here. No hardcoded values in other modules.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RugSentry";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("RugSentry/", env!("CARGO_PKG_VERSION"));

// ============================================
// RPC / POLLING CONSTANTS
// ============================================

/// Default timeout for RPC and explorer requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// How long the idle worker sleeps before re-checking the queue (seconds)
pub const DEFAULT_QUEUE_IDLE_SECS: u64 = 10;

/// Dedup set is cleared once it holds more contracts than this
pub const SEEN_CONTRACTS_CAP: usize = 10_000;

/// How often the binary polls for new blocks (seconds)
pub const DEFAULT_BLOCK_POLL_SECS: u64 = 12;

/// Retry policy for JSON-RPC calls
pub const RPC_BASE_RETRY_MS: u64 = 500;
pub const RPC_MAX_RETRY_MS: u64 = 8000;
pub const RPC_MAX_RETRIES: u32 = 4;
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// CHAIN IDS - Single Source of Truth
// ============================================

pub const CHAIN_ID_ETHEREUM: u64 = 1;
pub const CHAIN_ID_OPTIMISM: u64 = 10;
pub const CHAIN_ID_BSC: u64 = 56;
pub const CHAIN_ID_POLYGON: u64 = 137;
pub const CHAIN_ID_FANTOM: u64 = 250;
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
pub const CHAIN_ID_AVALANCHE: u64 = 43114;

/// All networks with a source-code explorer
pub const SUPPORTED_CHAIN_IDS: [u64; 7] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_OPTIMISM,
    CHAIN_ID_BSC,
    CHAIN_ID_POLYGON,
    CHAIN_ID_FANTOM,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_AVALANCHE,
];

/// Get chain name for display
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_OPTIMISM => "Optimism",
        CHAIN_ID_BSC => "BNB Smart Chain",
        CHAIN_ID_POLYGON => "Polygon",
        CHAIN_ID_FANTOM => "Fantom",
        CHAIN_ID_ARBITRUM => "Arbitrum One",
        CHAIN_ID_AVALANCHE => "Avalanche C-Chain",
        _ => "Unknown",
    }
}

/// Explorer API base URL (Etherscan-compatible `getsourcecode` endpoint)
pub fn get_explorer_api_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("https://api.etherscan.io/api"),
        CHAIN_ID_OPTIMISM => Some("https://api-optimistic.etherscan.io/api"),
        CHAIN_ID_BSC => Some("https://api.bscscan.com/api"),
        CHAIN_ID_POLYGON => Some("https://api.polygonscan.com/api"),
        CHAIN_ID_FANTOM => Some("https://api.ftmscan.com/api"),
        CHAIN_ID_ARBITRUM => Some("https://api.arbiscan.io/api"),
        CHAIN_ID_AVALANCHE => Some("https://api.snowtrace.io/api"),
        _ => None,
    }
}

/// Environment variable holding the explorer API key for a chain
pub fn get_explorer_key_env(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("ETHERSCAN_API_KEY"),
        CHAIN_ID_OPTIMISM => Some("OPTIMISM_ETHERSCAN_API_KEY"),
        CHAIN_ID_BSC => Some("BSCSCAN_API_KEY"),
        CHAIN_ID_POLYGON => Some("POLYGONSCAN_API_KEY"),
        CHAIN_ID_FANTOM => Some("FTMSCAN_API_KEY"),
        CHAIN_ID_ARBITRUM => Some("ARBISCAN_API_KEY"),
        CHAIN_ID_AVALANCHE => Some("SNOWTRACE_API_KEY"),
        _ => None,
    }
}

// ============================================
// CLASSIFIER SIGNATURES
// ============================================

/// Functions a contract must expose to be treated as a fungible token
pub const TOKEN_REQUIRED_FUNCTIONS: [&str; 9] = [
    "name",
    "symbol",
    "decimals",
    "totalSupply",
    "balanceOf",
    "transfer",
    "transferFrom",
    "approve",
    "allowance",
];

/// Events a contract must declare to be treated as a fungible token
pub const TOKEN_REQUIRED_EVENTS: [&str; 2] = ["Transfer", "Approval"];

/// Functions a contract must expose to be treated as ownable
pub const OWNABLE_REQUIRED_FUNCTIONS: [&str; 2] = ["owner", "transferOwnership"];

/// Events a contract must declare to be treated as ownable
pub const OWNABLE_REQUIRED_EVENTS: [&str; 1] = ["OwnershipTransferred"];

/// Conventional name of the balance ledger storage variable
pub const BALANCE_VARIABLE_NAME: &str = "_balances";

/// Conventional name of the total supply storage variable
pub const TOTAL_SUPPLY_VARIABLE_NAME: &str = "_totalSupply";

/// Conventional internal mint entry point
pub const MINT_FUNCTION_NAME: &str = "_mint";

/// Conventional ownership transfer entry point
pub const TRANSFER_OWNERSHIP_FUNCTION_NAME: &str = "transferOwnership";

// ============================================
// DECODER / HARNESS CONSTANTS
// ============================================

/// Bytes of runtime code used to locate the constructor arguments
pub const RUNTIME_SUFFIX_LEN: usize = 16;

/// Prefix of the locals that hold array constructor arguments in `setUp`
pub const ARGUMENT_LOCAL_PREFIX: &str = "ctorArg";

/// Supply minted to the harness deployer by the injected constructor (1M tokens at 18 decimals)
pub const INJECTED_MINT_AMOUNT: &str = "1000000000000000000000000";

/// Amount moved between actors by the transfer-based invariants
pub const HARNESS_TRANSFER_AMOUNT: &str = "10000";

/// Amount each seeded actor receives
pub const HARNESS_SEED_AMOUNT: &str = "1000000000000000000";

/// Simulated time advanced before invariants are checked
pub const HARNESS_TIME_WARP: &str = "365 days";

/// Path of the synthesized test file inside the forge project
pub const TEST_FILE_PATH: &str = "test/test.sol";

/// forge-std import appended to the injected source
pub const FORGE_STD_IMPORT: &str = "import \"forge-std/Test.sol\";";

// ============================================
// INTERPRETER CONSTANTS
// ============================================

/// Sub-test that only performs setup and never counts toward the verdict
pub const SETUP_TEST_NAME: &str = "setUp()";

/// Reason prefix forge uses for low-level VM faults (inconclusive, not a violated invariant)
pub const VM_FAULT_MARKER: &str = "EvmError";

/// Prefix and suffix of synthesized test contract names
pub const TEST_CONTRACT_PREFIX: &str = "Dynamic";
pub const TEST_CONTRACT_SUFFIX: &str = "Test";

/// Alert id emitted when several techniques fire for one contract
pub const AGGREGATE_ALERT_ID: &str = "HARD-RUG-PULL-1";

/// Label confidence for single-technique findings
pub const SINGLE_TECHNIQUE_CONFIDENCE: f64 = 0.5;

/// Label confidence for the aggregate finding
pub const AGGREGATE_CONFIDENCE: f64 = 0.8;

/// Number of independent techniques that triggers the aggregate finding
pub const AGGREGATE_THRESHOLD: usize = 2;
