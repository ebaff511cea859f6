//! Models Module - Data Structures & Errors
//!
//! Single source of truth for the data flowing through the pipeline.

pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;
