//! Identifier write-back guard
//!
//! Every datastore write in a run goes through [`IdentifierWriter::apply`],
//! which is the only place the dry-run flag is checked.

use crate::db::CompanyStore;
use crate::report::WriteStatus;
use crate::scorer::ScoredMatch;
use std::sync::Arc;

pub struct IdentifierWriter {
    store: Arc<dyn CompanyStore>,
    dry_run: bool,
}

impl IdentifierWriter {
    pub fn new(store: Arc<dyn CompanyStore>, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Write a match's SIREN/SIRET to a target row
    ///
    /// Never touches the store in dry-run mode.
    pub async fn apply(&self, target_id: &str, matched: &ScoredMatch) -> WriteStatus {
        if self.dry_run {
            return WriteStatus::DryRun;
        }

        match self
            .store
            .write_identifiers(
                target_id,
                &matched.candidate.registry_id,
                &matched.candidate.establishment_id,
            )
            .await
        {
            Ok(()) => WriteStatus::Updated,
            Err(e) => {
                tracing::error!(id = %target_id, error = %e, "Identifier write failed");
                WriteStatus::Failed(e.to_string())
            }
        }
    }
}
