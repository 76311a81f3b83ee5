//! ftt-siren library interface
//!
//! Matches tracked companies against the INSEE Sirene registry and writes
//! back SIREN/SIRET identifiers for high-confidence matches.

pub mod config;
pub mod db;
pub mod error;
pub mod normalize;
pub mod query;
pub mod report;
pub mod scorer;
pub mod services;
pub mod similarity;
pub mod workflow;

pub use crate::error::{MatchError, MatchResult};
