//! External service adapters
//!
//! - `sirene_client`: INSEE Sirene establishment search
//! - `pacer`: request pacing shared by registry calls

pub mod pacer;
pub mod sirene_client;

pub use pacer::RequestPacer;
pub use sirene_client::{SireneClient, RATE_LIMIT_MS, SIRENE_BASE_URL};

use crate::error::MatchResult;
use crate::query::SireneQuery;
use crate::scorer::MatchCandidate;
use async_trait::async_trait;

/// Business registry search contract
///
/// An empty result list means "no results" and is not an error.
/// Implementations fail with `RateLimited` on HTTP 429 and with
/// `RegistryUnavailable` on any other non-success answer.
#[async_trait]
pub trait RegistrySearch: Send + Sync {
    async fn search(&self, query: &SireneQuery) -> MatchResult<Vec<MatchCandidate>>;
}
