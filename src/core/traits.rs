//! Seams between the pipeline and its collaborators
//!
//! Everything slow or external sits behind one of these traits so the agent
//! and pipeline run against in-memory doubles in tests.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::core::interpreter::TestReport;
use crate::models::errors::AppResult;
use crate::models::types::{Finding, PendingTask};

/// Verified source code lookup
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Single flattened compilation unit, or `None` when the contract is unverified
    async fn fetch_source(&self, chain_id: u64, address: Address) -> AppResult<Option<String>>;
}

/// Read access to chain state
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Deployed runtime bytecode at `address` (empty for EOAs)
    async fn get_code(&self, address: Address) -> AppResult<Bytes>;
}

/// External invariant-testing engine
#[async_trait]
pub trait VerificationEngine: Send + Sync {
    /// Run the test file against a fork pinned at `block_number`
    ///
    /// Tooling failures yield an empty report rather than an error.
    async fn run(&self, test_source: &str, block_number: u64) -> TestReport;
}

/// Work performed by the pipeline's single consumer
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task: &PendingTask) -> AppResult<Vec<Finding>>;
}
