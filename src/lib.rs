//! Rug Sentry Library
//!
//! Contract intelligence and dynamic invariant testing for newly deployed
//! EVM contracts. For every contract-creation transaction it:
//! - classifies the verified source (token / ownable)
//! - recovers the constructor arguments from the deployment input
//! - synthesizes forge invariant tests for the known rug-pull techniques
//! - runs them against a fork and turns failures into findings

pub mod config;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use config::AgentConfig;
pub use core::{ContractInspector, RugPullAgent, TaskPipeline, Technique};
pub use models::{AppError, AppResult, ErrorCode, Finding, FindingSeverity, TxEvent};
pub use providers::{ExplorerClient, ExplorerSourceProvider, ForgeRunner, RpcProvider};
