//! # FTT Common Library
//!
//! Shared code for the French Tech funding tracker tools:
//! - Common error and result types
//! - TOML configuration loading and tiered setting resolution
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
