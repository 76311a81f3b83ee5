//! Batch SIREN/SIRET matching workflow
//!
//! Targets are resolved strictly one at a time: primary query, fallback
//! query when the primary returned nothing, scoring, classification, then the
//! optional write. Request pacing is enforced by the registry client, and
//! cancellation is only checked between targets.

pub mod confirm;
pub mod writer;

pub use confirm::{Confirm, FixedConfirm, StdinConfirm};
pub use writer::IdentifierWriter;

use crate::db::{CompanyStore, MatchTarget, TargetFilter};
use crate::error::MatchResult;
use crate::query::QueryPlan;
use crate::report::{ConfirmationOutcome, MatchRecord, MatchReport, WriteStatus};
use crate::scorer::{CandidatePool, ConfidenceTier, MatchScorer, ScoredMatch};
use crate::services::RegistrySearch;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Operator switches for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Never write to the datastore
    pub dry_run: bool,
    /// Hold HIGH matches until the operator approves the whole batch
    pub confirm: bool,
    /// Maximum number of targets processed
    pub limit: Option<usize>,
}

/// Sequential matcher over a batch of targets
pub struct BatchMatcher {
    registry: Arc<dyn RegistrySearch>,
    store: Arc<dyn CompanyStore>,
    writer: IdentifierWriter,
    scorer: MatchScorer,
    options: RunOptions,
    cancel: CancellationToken,
}

impl BatchMatcher {
    pub fn new(
        registry: Arc<dyn RegistrySearch>,
        store: Arc<dyn CompanyStore>,
        options: RunOptions,
    ) -> Self {
        let writer = IdentifierWriter::new(Arc::clone(&store), options.dry_run);
        Self {
            registry,
            store,
            writer,
            scorer: MatchScorer::new(),
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between targets once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fetch targets, process them and run the confirmation gate
    pub async fn run(&self, filter: &TargetFilter, confirm: &dyn Confirm) -> MatchResult<MatchReport> {
        let targets = self.fetch_targets(filter).await?;
        let mut report = self.process(targets).await;
        if let Some(outcome) = self.confirm_high_matches(&mut report, confirm).await {
            report.confirmation = Some(outcome);
        }
        Ok(report)
    }

    /// Read the targets selected by `filter`
    pub async fn fetch_targets(&self, filter: &TargetFilter) -> MatchResult<Vec<MatchTarget>> {
        let targets = self.store.find_unmatched_targets(filter).await?;
        info!("Found {} companies to process", targets.len());
        Ok(targets)
    }

    /// Resolve each target in order and collect the report
    ///
    /// Per-target failures are recorded and the batch continues; a fatal
    /// error (rate limiting) halts the run after recording it.
    pub async fn process(&self, targets: Vec<MatchTarget>) -> MatchReport {
        let limit = self.options.limit.unwrap_or(usize::MAX);
        let targets: Vec<MatchTarget> = targets.into_iter().take(limit).collect();
        let total = targets.len();
        let mut report = MatchReport::new(total, self.writer.is_dry_run());

        for (index, target) in targets.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping before next company");
                report.cancelled = true;
                break;
            }

            report.processed += 1;
            info!(
                city = %target.city.as_deref().unwrap_or("unknown"),
                "[{}/{}] {}",
                index + 1,
                total,
                target.name
            );

            match self.resolve(&target).await {
                Ok(Some(matched)) => {
                    info!(
                        siren = %matched.candidate.registry_id,
                        siret = %matched.candidate.establishment_id,
                        confidence = %matched.tier,
                        score = %format!("{:.2}", matched.score),
                        "Match: {}",
                        matched.candidate.legal_name
                    );

                    let write = if matched.tier == ConfidenceTier::High {
                        let status = if self.options.confirm {
                            WriteStatus::Pending
                        } else {
                            self.writer.apply(&target.id, &matched).await
                        };
                        info!("Database: {}", status);
                        Some(status)
                    } else {
                        None
                    };

                    report.record_match(target, matched, write);
                }
                Ok(None) => {
                    info!("Result: NOT FOUND");
                    report.record_not_found(target);
                }
                Err(e) => {
                    warn!(company = %target.name, error = %e, "Lookup failed");
                    let fatal = e.is_fatal();
                    let message = e.to_string();
                    report.record_error(target, message.clone());
                    if fatal {
                        error!("Stopping run: {}", message);
                        report.halted = Some(message);
                        break;
                    }
                }
            }
        }

        report
    }

    /// Find the best registry match for one target
    ///
    /// The broader name-only query is only issued when the city-filtered
    /// one returns nothing; candidates from both attempts share one pool.
    pub async fn resolve(&self, target: &MatchTarget) -> MatchResult<Option<ScoredMatch>> {
        let pool = self.gather_candidates(target).await?;

        Ok(self
            .scorer
            .best_match(&target.name, target.city.as_deref(), pool.candidates()))
    }

    /// Query the registry for a target, falling back to a name-only search
    pub async fn gather_candidates(&self, target: &MatchTarget) -> MatchResult<CandidatePool> {
        let plan = QueryPlan::new(&target.name, target.city.as_deref())?;

        let mut pool = CandidatePool::new();
        pool.extend(self.registry.search(&plan.primary).await?);

        if pool.is_empty() {
            if let Some(fallback) = plan.fallback() {
                tracing::debug!(query = %fallback, "No results with city filter, retrying without");
                pool.extend(self.registry.search(&fallback).await?);
            }
        }

        Ok(pool)
    }

    /// Ask the operator to approve pending HIGH matches, then write them
    ///
    /// Returns `None` when confirmation mode is off or nothing is pending.
    pub async fn confirm_high_matches(
        &self,
        report: &mut MatchReport,
        confirm: &dyn Confirm,
    ) -> Option<ConfirmationOutcome> {
        if !self.options.confirm {
            return None;
        }

        let pending: Vec<usize> = report
            .high
            .iter()
            .enumerate()
            .filter(|(_, r)| r.write == Some(WriteStatus::Pending))
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() {
            return None;
        }

        let records: Vec<&MatchRecord> = pending.iter().map(|&i| &report.high[i]).collect();
        let approved = confirm.confirm(&confirmation_message(&records));

        let mut updated = 0;
        for &i in &pending {
            let record = &mut report.high[i];
            let status = if approved {
                self.writer.apply(&record.target.id, &record.matched).await
            } else {
                WriteStatus::Declined
            };
            if status == WriteStatus::Updated {
                updated += 1;
            }
            record.write = Some(status);
        }

        Some(ConfirmationOutcome {
            approved,
            attempted: pending.len(),
            updated,
        })
    }
}

/// Listing and question shown before applying HIGH matches
pub fn confirmation_message(records: &[&MatchRecord]) -> String {
    let mut message = String::from("\n--- HIGH CONFIDENCE MATCHES TO APPLY ---\n");
    for r in records {
        message.push_str(&format!(
            "  {} -> {} (SIREN: {})\n",
            r.target.name, r.matched.candidate.legal_name, r.matched.candidate.registry_id
        ));
    }
    message.push_str(&format!(
        "\nApply these {} high confidence matches? (y/n): ",
        records.len()
    ));
    message
}
