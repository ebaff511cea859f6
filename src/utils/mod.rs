//! Utils Module - Helper Functions & Shared Utilities

pub mod constants;
pub mod literals;

pub use constants::*;
pub use literals::*;
