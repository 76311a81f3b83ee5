//! Company name normalization for comparison
//!
//! Applied identically to target names, candidate legal names, aliases and
//! city names before any comparison:
//! 1. Upper-case
//! 2. Strip diacritics (NFD, drop combining marks)
//! 3. Anything outside `[A-Z0-9 ]` becomes a space
//! 4. Drop standalone legal-form tokens
//! 5. Collapse whitespace

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// French legal-form abbreviations removed as whole words
pub const LEGAL_FORMS: &[&str] = &["SAS", "SA", "SARL", "SASU", "SNC", "EURL", "SCI", "GIE"];

/// Normalize a company (or city) name for comparison
///
/// ```
/// use ftt_siren::normalize::normalize_name;
///
/// assert_eq!(normalize_name("Société Générale SA"), "SOCIETE GENERALE");
/// assert_eq!(normalize_name("  l'Oréal  "), "L OREAL");
/// ```
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_uppercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded
        .split_whitespace()
        .filter(|token| !is_legal_form(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check whether a normalized token is a legal-form abbreviation
pub fn is_legal_form(token: &str) -> bool {
    LEGAL_FORMS.contains(&token)
}
