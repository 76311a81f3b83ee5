//! Name similarity scoring
//!
//! `similarity` returns a value in [0, 1]. Rules, first match wins:
//! - identical normalized strings: 1.0
//! - one contained in the other: `len(shorter) / len(longer)`
//! - otherwise: `1 - levenshtein / max(len)`
//!
//! Containment is checked before edit distance because unit-cost Levenshtein
//! heavily penalises a short name that is a literal prefix of a long one.

use crate::normalize::normalize_name;

/// Similarity between two raw names (both are normalized first)
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_normalized(&normalize_name(a), &normalize_name(b))
}

/// Similarity between two already-normalized names
pub fn similarity_normalized(s1: &str, s2: &str) -> f64 {
    if s1 == s2 {
        return 1.0;
    }

    let len1 = s1.chars().count();
    let len2 = s2.chars().count();

    if s1.contains(s2) || s2.contains(s1) {
        let (shorter, longer) = if len1 < len2 { (len1, len2) } else { (len2, len1) };
        return shorter as f64 / longer as f64;
    }

    let max_len = len1.max(len2);
    if max_len == 0 {
        return 1.0;
    }

    1.0 - strsim::levenshtein(s1, s2) as f64 / max_len as f64
}
