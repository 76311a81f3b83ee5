//! Candidate scoring, ranking and confidence classification

use crate::normalize::normalize_name;
use crate::similarity::similarity_normalized;
use std::collections::HashSet;
use std::fmt;

/// One registry search result (an establishment of a legal unit)
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// Official registered name
    pub legal_name: String,
    /// Short or trade name
    pub alias: Option<String>,
    /// City of the establishment
    pub city: Option<String>,
    /// Whether this establishment is the registered head office
    pub is_headquarters: bool,
    /// SIREN (legal unit, 9 digits)
    pub registry_id: String,
    /// SIRET (establishment, 14 digits)
    pub establishment_id: String,
}

/// Confidence bucket controlling automatic vs. manual handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceTier {
    /// Written back automatically (or after batch confirmation)
    High,
    /// Review recommended
    Medium,
    /// Manual review required
    Low,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "HIGH",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::Low => "LOW",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate annotated with its score and tier
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub candidate: MatchCandidate,
    /// Best similarity across legal name and alias, in [0, 1]
    pub name_similarity: f64,
    pub city_match: bool,
    /// `name_similarity` plus city and headquarters bonuses; may exceed 1.0
    pub score: f64,
    pub tier: ConfidenceTier,
}

/// Candidates gathered across the primary and fallback searches
///
/// Establishments already seen (same SIRET) are not added twice.
#[derive(Debug, Default)]
pub struct CandidatePool {
    candidates: Vec<MatchCandidate>,
    seen: HashSet<String>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = MatchCandidate>) {
        for candidate in candidates {
            if self.seen.insert(candidate.establishment_id.clone()) {
                self.candidates.push(candidate);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[MatchCandidate] {
        &self.candidates
    }
}

/// Ranks candidates for one target and classifies the winner
///
/// Classification, first rule wins:
/// - similarity >= 0.98: HIGH, city ignored (caller city data may be stale)
/// - similarity >= 0.95 with city agreement: HIGH
/// - similarity >= 0.80, or >= 0.60 with city agreement: MEDIUM
/// - otherwise LOW
#[derive(Debug, Clone)]
pub struct MatchScorer {
    city_bonus: f64,
    headquarters_bonus: f64,
    high_threshold: f64,
    high_with_city_threshold: f64,
    medium_threshold: f64,
    medium_with_city_threshold: f64,
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchScorer {
    pub fn new() -> Self {
        Self {
            city_bonus: 0.2,
            headquarters_bonus: 0.1,
            high_threshold: 0.98,
            high_with_city_threshold: 0.95,
            medium_threshold: 0.80,
            medium_with_city_threshold: 0.60,
        }
    }

    /// Assign a tier from name similarity and city agreement
    pub fn classify(&self, name_similarity: f64, city_match: bool) -> ConfidenceTier {
        if name_similarity >= self.high_threshold {
            ConfidenceTier::High
        } else if name_similarity >= self.high_with_city_threshold && city_match {
            ConfidenceTier::High
        } else if name_similarity >= self.medium_threshold
            || (name_similarity >= self.medium_with_city_threshold && city_match)
        {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    /// Score one candidate against a target name and city
    pub fn score(&self, target_name: &str, target_city: Option<&str>, candidate: &MatchCandidate) -> ScoredMatch {
        let target = normalize_name(target_name);

        let legal_sim = similarity_normalized(&target, &normalize_name(&candidate.legal_name));
        let alias_sim = candidate
            .alias
            .as_deref()
            .map(|alias| similarity_normalized(&target, &normalize_name(alias)))
            .unwrap_or(0.0);
        let name_similarity = legal_sim.max(alias_sim);

        let city_match = cities_match(target_city, candidate.city.as_deref());

        let mut score = name_similarity;
        if city_match {
            score += self.city_bonus;
        }
        if candidate.is_headquarters {
            score += self.headquarters_bonus;
        }

        ScoredMatch {
            candidate: candidate.clone(),
            name_similarity,
            city_match,
            score,
            tier: self.classify(name_similarity, city_match),
        }
    }

    /// Select the highest-scoring candidate
    ///
    /// Only a strictly greater score replaces the current best, so the
    /// first-seen candidate wins exact ties. A candidate must score above
    /// zero to be selected; `None` means not found.
    pub fn best_match(
        &self,
        target_name: &str,
        target_city: Option<&str>,
        candidates: &[MatchCandidate],
    ) -> Option<ScoredMatch> {
        let mut best: Option<ScoredMatch> = None;

        for candidate in candidates {
            let scored = self.score(target_name, target_city, candidate);
            let current = best.as_ref().map(|b| b.score).unwrap_or(0.0);
            if scored.score > current {
                best = Some(scored);
            }
        }

        best
    }
}

/// Normalized city equality; false when either side is absent or blank
fn cities_match(target_city: Option<&str>, candidate_city: Option<&str>) -> bool {
    match (target_city, candidate_city) {
        (Some(a), Some(b)) => {
            let a = normalize_name(a);
            !a.is_empty() && a == normalize_name(b)
        }
        _ => false,
    }
}
