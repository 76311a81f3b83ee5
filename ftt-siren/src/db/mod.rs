//! Company datastore access
//!
//! Two backends implement [`CompanyStore`]:
//! - [`rest::RestStore`]: the hosted PostgREST (Supabase) `companies` table
//! - [`sqlite::SqliteStore`]: a local SQLite copy of the same table

pub mod rest;
pub mod sqlite;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

use crate::error::MatchResult;
use async_trait::async_trait;

/// A company awaiting (or being re-checked for) registry identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct MatchTarget {
    /// Datastore row id (opaque)
    pub id: String,
    pub name: String,
    /// Headquarters city, if known
    pub city: Option<String>,
    /// Existing SIREN
    pub registry_id: Option<String>,
    /// Existing SIRET
    pub establishment_id: Option<String>,
}

impl MatchTarget {
    pub fn new(id: impl Into<String>, name: impl Into<String>, city: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            city: city.map(str::to_string),
            registry_id: None,
            establishment_id: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.registry_id.is_some()
    }
}

/// Target selection
#[derive(Debug, Clone)]
pub struct TargetFilter {
    /// Only companies headquartered in this country
    pub country: String,
    /// Include companies that already have a SIREN (force re-match)
    pub include_matched: bool,
    /// Case-insensitive name substring
    pub name_contains: Option<String>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self {
            country: "France".to_string(),
            include_matched: false,
            name_contains: None,
            limit: None,
        }
    }
}

/// Datastore contract used by the matcher
#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Companies to match, ordered by name
    async fn find_unmatched_targets(&self, filter: &TargetFilter) -> MatchResult<Vec<MatchTarget>>;

    /// Record identifiers on a company; idempotent
    async fn write_identifiers(
        &self,
        target_id: &str,
        registry_id: &str,
        establishment_id: &str,
    ) -> MatchResult<()>;
}
