//! Sirene search query builder
//!
//! Builds a structured query from a company name and optional city, then
//! serializes it to the registry's Lucene-like grammar via `Display`:
//!
//! ```text
//! denominationUniteLegale:"MISTRAL AI" AND libelleCommuneEtablissement:PARIS* AND etatAdministratifUniteLegale:A
//! ```

use crate::error::{MatchError, MatchResult};
use std::fmt;

/// Characters reserved by the query grammar, replaced by spaces
pub const RESERVED_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

const NAME_FIELD: &str = "denominationUniteLegale";
const CITY_FIELD: &str = "libelleCommuneEtablissement";
const ACTIVE_FILTER: &str = "etatAdministratifUniteLegale:A";

/// Replace reserved characters with spaces, collapse whitespace, upper-case
pub fn escape_query(text: &str) -> String {
    text.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// One field value in a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Multi-word value, matched as an exact quoted phrase
    Phrase(String),
    /// Single word, matched as a prefix (trailing wildcard)
    Prefix(String),
}

impl Term {
    /// Pick phrase or prefix matching for an escaped value
    ///
    /// Returns `None` when nothing is left to search for.
    pub fn from_escaped(value: String) -> Option<Self> {
        if value.is_empty() {
            None
        } else if value.contains(' ') {
            Some(Term::Phrase(value))
        } else {
            Some(Term::Prefix(value))
        }
    }

    fn render(&self, field: &str) -> String {
        match self {
            Term::Phrase(v) => format!("{}:\"{}\"", field, v),
            Term::Prefix(v) => format!("{}:{}*", field, v),
        }
    }
}

/// Structured registry query
///
/// The active-entity filter is not a field: it is always part of the
/// serialized form, so dissolved entities can never be requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SireneQuery {
    name: Term,
    city: Option<Term>,
}

impl SireneQuery {
    /// Build a query for a company name and optional city
    ///
    /// # Errors
    /// `Validation` when the name is empty once reserved characters and
    /// whitespace are removed. A blank city is treated as absent.
    pub fn build(name: &str, city: Option<&str>) -> MatchResult<Self> {
        let name = Term::from_escaped(escape_query(name)).ok_or_else(|| {
            MatchError::Validation(format!("company name {:?} is empty after normalization", name))
        })?;
        let city = city.and_then(|c| Term::from_escaped(escape_query(c)));

        Ok(Self { name, city })
    }

    pub fn name(&self) -> &Term {
        &self.name
    }

    pub fn city(&self) -> Option<&Term> {
        self.city.as_ref()
    }

    pub fn has_city_filter(&self) -> bool {
        self.city.is_some()
    }

    /// Same query without the city clause
    pub fn broader(&self) -> Self {
        Self {
            name: self.name.clone(),
            city: None,
        }
    }
}

impl fmt::Display for SireneQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.render(NAME_FIELD))?;
        if let Some(city) = &self.city {
            write!(f, " AND {}", city.render(CITY_FIELD))?;
        }
        write!(f, " AND {}", ACTIVE_FILTER)
    }
}

/// City-filtered query plus its lazily-issued name-only fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub primary: SireneQuery,
}

impl QueryPlan {
    pub fn new(name: &str, city: Option<&str>) -> MatchResult<Self> {
        Ok(Self {
            primary: SireneQuery::build(name, city)?,
        })
    }

    /// Broader query to issue when the primary returns nothing
    ///
    /// `None` when the primary has no city clause, since the fallback
    /// would be the identical request.
    pub fn fallback(&self) -> Option<SireneQuery> {
        self.primary
            .has_city_filter()
            .then(|| self.primary.broader())
    }
}
