//! Run report grouped by confidence tier

use crate::db::MatchTarget;
use crate::scorer::{ConfidenceTier, ScoredMatch};
use std::fmt;

const RULE: &str = "=================================================";

/// Outcome of writing a HIGH match back to the datastore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Updated,
    Failed(String),
    /// Dry run: the write was suppressed
    DryRun,
    /// Waiting for batch confirmation
    Pending,
    /// Operator declined the batch
    Declined,
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStatus::Updated => f.write_str("UPDATED"),
            WriteStatus::Failed(msg) => write!(f, "FAILED ({})", msg),
            WriteStatus::DryRun => f.write_str("NOT WRITTEN (dry run)"),
            WriteStatus::Pending => f.write_str("PENDING (will confirm later)"),
            WriteStatus::Declined => f.write_str("NOT WRITTEN (declined)"),
        }
    }
}

/// A target with its selected registry match
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub target: MatchTarget,
    pub matched: ScoredMatch,
    /// Only set for HIGH matches
    pub write: Option<WriteStatus>,
}

/// A target that could not be resolved
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub target: MatchTarget,
    pub message: String,
}

/// Result of the batch confirmation gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationOutcome {
    pub approved: bool,
    pub attempted: usize,
    pub updated: usize,
}

impl fmt::Display for ConfirmationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.approved {
            write!(f, "Updated {}/{} companies.", self.updated, self.attempted)
        } else {
            f.write_str("No changes made.")
        }
    }
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct MatchReport {
    pub high: Vec<MatchRecord>,
    pub medium: Vec<MatchRecord>,
    pub low: Vec<MatchRecord>,
    pub not_found: Vec<MatchTarget>,
    pub errors: Vec<ErrorRecord>,
    /// Targets selected for the run
    pub total: usize,
    /// Targets actually attempted
    pub processed: usize,
    /// Stopped early by a cancellation request
    pub cancelled: bool,
    /// Stopped early by a fatal error (rate limiting)
    pub halted: Option<String>,
    pub dry_run: bool,
    pub confirmation: Option<ConfirmationOutcome>,
}

impl MatchReport {
    pub fn new(total: usize, dry_run: bool) -> Self {
        Self {
            total,
            dry_run,
            ..Self::default()
        }
    }

    /// File a match under its tier
    pub fn record_match(&mut self, target: MatchTarget, matched: ScoredMatch, write: Option<WriteStatus>) {
        let record = MatchRecord { target, matched, write };
        match record.matched.tier {
            ConfidenceTier::High => self.high.push(record),
            ConfidenceTier::Medium => self.medium.push(record),
            ConfidenceTier::Low => self.low.push(record),
        }
    }

    pub fn record_not_found(&mut self, target: MatchTarget) {
        self.not_found.push(target);
    }

    pub fn record_error(&mut self, target: MatchTarget, message: String) {
        self.errors.push(ErrorRecord { target, message });
    }

    /// HIGH matches actually written
    pub fn updated_count(&self) -> usize {
        self.high
            .iter()
            .filter(|r| r.write == Some(WriteStatus::Updated))
            .count()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    fn fmt_matches(f: &mut fmt::Formatter<'_>, title: &str, records: &[MatchRecord]) -> fmt::Result {
        if records.is_empty() {
            return Ok(());
        }
        writeln!(f, "\n--- {} ---", title)?;
        for r in records {
            writeln!(f, "\n  {} ({})", r.target.name, display_city(&r.target.city))?;
            writeln!(f, "    -> {}", r.matched.candidate.legal_name)?;
            write!(
                f,
                "    SIREN: {} | SIRET: {} | Score: {:.2}",
                r.matched.candidate.registry_id, r.matched.candidate.establishment_id, r.matched.score
            )?;
            match &r.write {
                Some(status) => writeln!(f, " | Database: {}", status)?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

fn display_city(city: &Option<String>) -> &str {
    city.as_deref().unwrap_or("unknown")
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n{}", RULE)?;
        writeln!(f, "SUMMARY")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "  Processed: {}/{}", self.processed, self.total)?;
        writeln!(
            f,
            "  High confidence: {} ({} updated)",
            self.high.len(),
            self.updated_count()
        )?;
        writeln!(f, "  Medium confidence (needs review): {}", self.medium.len())?;
        writeln!(f, "  Low confidence (manual review): {}", self.low.len())?;
        writeln!(f, "  Not found: {}", self.not_found.len())?;
        writeln!(f, "  Errors: {}", self.errors.len())?;

        Self::fmt_matches(f, "HIGH CONFIDENCE MATCHES", &self.high)?;
        Self::fmt_matches(f, "MEDIUM CONFIDENCE MATCHES (review recommended)", &self.medium)?;
        Self::fmt_matches(f, "LOW CONFIDENCE MATCHES (manual review required)", &self.low)?;

        if !self.not_found.is_empty() {
            writeln!(f, "\n--- NOT FOUND ---")?;
            for t in &self.not_found {
                writeln!(f, "  {} ({})", t.name, display_city(&t.city))?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "\n--- ERRORS ---")?;
            for e in &self.errors {
                writeln!(f, "  {}: {}", e.target.name, e.message)?;
            }
        }

        if let Some(reason) = &self.halted {
            writeln!(
                f,
                "\n[HALTED] {}. {} target(s) left unprocessed; re-run later to resume.",
                reason,
                self.total - self.processed
            )?;
        } else if self.cancelled {
            writeln!(
                f,
                "\n[CANCELLED] {} target(s) left unprocessed.",
                self.total - self.processed
            )?;
        }

        if let Some(outcome) = &self.confirmation {
            writeln!(f, "\n{}", outcome)?;
        }

        if self.dry_run {
            writeln!(f, "\n[DRY RUN] No database updates were made.")?;
            writeln!(f, "Run with --confirm to review and apply high-confidence matches.")?;
        }

        write!(f, "\n{}", RULE)
    }
}
