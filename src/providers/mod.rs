//! Providers Module - External Data Sources
//!
//! JSON-RPC chain access, block-explorer source retrieval and the Foundry
//! toolchain adapter.

pub mod explorer;
pub mod forge;
pub mod rpc;

pub use explorer::{ExplorerClient, ExplorerSourceProvider, SourceBundle};
pub use forge::{parse_report, ForgeRunner};
pub use rpc::{RpcBlock, RpcProvider, RpcTransaction};
