//! Centralized Error Handling Module
//!
//! Every failure in the pipeline carries a unique error code so a skipped
//! contract can be traced back to the stage that dropped it.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx: unsupported input (skip the contract quietly)
//! - PARSE_xxx / DECODE_xxx: malformed source or call data (drop the contract)
//! - TOOL_xxx: external tooling failures (empty result, no finding)
//! - RPC_xxx / CFG_xxx: collaborators and configuration

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Category of the failure
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// How the worker should treat a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input we do not handle; skip without noise
    Unsupported,
    /// Malformed source or call data; log and drop the contract
    Malformed,
    /// External tool or service misbehaved
    Tooling,
    /// Misconfiguration or anything else
    Internal,
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Unsupported input (1xx)
    // ============================================
    /// Network has no explorer endpoint
    UnsupportedNetwork,
    /// Explorer has no verified source for the address
    SourceNotFound,
    /// Runtime bytecode suffix not present in deployment data
    BytecodeSuffixNotFound,
    /// Call data carries arguments but the constructor takes none
    UnexpectedConstructorArgs,
    /// Constructor parameter type cannot be expressed as an ABI type
    UnsupportedParameterType,

    // ============================================
    // Parse / decode failures (2xx)
    // ============================================
    /// Solidity parser rejected the source
    ParseFailed,
    /// A base contract is never declared in the compilation unit
    UnresolvedBaseContract,
    /// No contract qualifies as the entry point
    NoEntryContract,
    /// Constructor arguments do not match the declared signature
    AbiDecodeFailed,
    /// Explorer payload is not a recognised source layout
    MalformedSourceBundle,

    // ============================================
    // Tooling failures (3xx)
    // ============================================
    /// forge exited unsuccessfully or could not be spawned
    EngineFailed,
    /// forge produced output that is not JSON
    EngineOutputInvalid,
    /// forge flatten failed for every file
    FlattenFailed,

    // ============================================
    // Collaborators (4xx)
    // ============================================
    /// RPC request failed
    RpcError,
    /// RPC returned an unexpected payload
    RpcInvalidResponse,
    /// Explorer request failed
    ExplorerError,
    /// External service timeout
    ExternalTimeout,

    // ============================================
    // Configuration (5xx)
    // ============================================
    /// Missing API key
    ConfigMissingApiKey,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic (9xx)
    // ============================================
    /// Filesystem error
    Io,
    /// Worker task panicked
    TaskPanicked,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedNetwork => "INPUT_UNSUPPORTED_NETWORK",
            Self::SourceNotFound => "INPUT_SOURCE_NOT_FOUND",
            Self::BytecodeSuffixNotFound => "INPUT_BYTECODE_SUFFIX_NOT_FOUND",
            Self::UnexpectedConstructorArgs => "INPUT_UNEXPECTED_CONSTRUCTOR_ARGS",
            Self::UnsupportedParameterType => "INPUT_UNSUPPORTED_PARAMETER_TYPE",

            Self::ParseFailed => "PARSE_FAILED",
            Self::UnresolvedBaseContract => "PARSE_UNRESOLVED_BASE",
            Self::NoEntryContract => "PARSE_NO_ENTRY_CONTRACT",
            Self::AbiDecodeFailed => "DECODE_ABI_MISMATCH",
            Self::MalformedSourceBundle => "DECODE_MALFORMED_SOURCE_BUNDLE",

            Self::EngineFailed => "TOOL_ENGINE_FAILED",
            Self::EngineOutputInvalid => "TOOL_ENGINE_OUTPUT_INVALID",
            Self::FlattenFailed => "TOOL_FLATTEN_FAILED",

            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",
            Self::ExplorerError => "EXPLORER_ERROR",
            Self::ExternalTimeout => "EXTERNAL_TIMEOUT",

            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Io => "IO_ERROR",
            Self::TaskPanicked => "TASK_PANICKED",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Classify the code for the worker's logging policy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedNetwork
            | Self::SourceNotFound
            | Self::BytecodeSuffixNotFound
            | Self::UnexpectedConstructorArgs
            | Self::UnsupportedParameterType => ErrorCategory::Unsupported,

            Self::ParseFailed
            | Self::UnresolvedBaseContract
            | Self::NoEntryContract
            | Self::AbiDecodeFailed
            | Self::MalformedSourceBundle => ErrorCategory::Malformed,

            Self::EngineFailed
            | Self::EngineOutputInvalid
            | Self::FlattenFailed
            | Self::RpcError
            | Self::RpcInvalidResponse
            | Self::ExplorerError
            | Self::ExternalTimeout => ErrorCategory::Tooling,

            _ => ErrorCategory::Internal,
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn unsupported_network(chain_id: u64) -> Self {
        Self::new(
            ErrorCode::UnsupportedNetwork,
            format!("Network not supported: {}", chain_id),
        )
    }

    pub fn parse_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseFailed, msg)
    }

    pub fn unresolved_base(contract: &str, base: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvedBaseContract,
            format!("{} inherits from undeclared contract {}", contract, base),
        )
    }

    pub fn no_entry_contract(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoEntryContract, msg)
    }

    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedParameterType, msg)
    }

    pub fn abi_decode(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AbiDecodeFailed, msg)
    }

    pub fn engine_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EngineFailed, msg)
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn explorer(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExplorerError, msg)
    }

    pub fn missing_api_key(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingApiKey,
            format!("Missing API key: {}", key_name),
        )
    }
}

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Io, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ExternalTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcError, "Connection failed")
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}
