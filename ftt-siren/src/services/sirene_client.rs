//! INSEE Sirene API client
//!
//! Searches establishments (`/siret`) by legal name with the free-tier API
//! key header. Every request first waits on the shared [`RequestPacer`].

use super::{RegistrySearch, RequestPacer};
use crate::error::{MatchError, MatchResult};
use crate::query::SireneQuery;
use crate::scorer::MatchCandidate;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const SIRENE_BASE_URL: &str = "https://api.insee.fr/api-sirene/3.11/siret";
/// ~28 requests/minute, under the free tier's 30/minute quota
pub const RATE_LIMIT_MS: u64 = 2100;
pub const DEFAULT_RESULTS_PER_QUERY: u32 = 10;
const API_KEY_HEADER: &str = "X-INSEE-Api-Key-Integration";

/// Sirene search response
#[derive(Debug, Deserialize)]
struct SireneResponse {
    #[serde(default)]
    etablissements: Vec<Etablissement>,
}

/// Sirene establishment record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Etablissement {
    siren: String,
    siret: String,
    #[serde(default)]
    etablissement_siege: Option<bool>,
    #[serde(default)]
    unite_legale: Option<UniteLegale>,
    #[serde(default)]
    adresse_etablissement: Option<AdresseEtablissement>,
    #[serde(default)]
    libelle_commune_etablissement: Option<String>,
}

/// Legal unit attached to an establishment
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniteLegale {
    #[serde(default)]
    denomination_unite_legale: Option<String>,
    #[serde(default)]
    sigle_unite_legale: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdresseEtablissement {
    #[serde(default)]
    libelle_commune_etablissement: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<Etablissement> for MatchCandidate {
    fn from(etab: Etablissement) -> Self {
        let (legal_name, alias) = match etab.unite_legale {
            Some(unite) => (
                unite.denomination_unite_legale.unwrap_or_default(),
                non_blank(unite.sigle_unite_legale),
            ),
            None => (String::new(), None),
        };

        let city = non_blank(
            etab.adresse_etablissement
                .and_then(|a| a.libelle_commune_etablissement),
        )
        .or_else(|| non_blank(etab.libelle_commune_etablissement));

        MatchCandidate {
            legal_name,
            alias,
            city,
            is_headquarters: etab.etablissement_siege.unwrap_or(false),
            registry_id: etab.siren,
            establishment_id: etab.siret,
        }
    }
}

/// Decode a Sirene search response body into candidates
pub fn parse_search_response(body: &str) -> MatchResult<Vec<MatchCandidate>> {
    let response: SireneResponse =
        serde_json::from_str(body).map_err(|e| MatchError::Parse(e.to_string()))?;

    Ok(response
        .etablissements
        .into_iter()
        .map(MatchCandidate::from)
        .collect())
}

/// Sirene API client
pub struct SireneClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    results_per_query: u32,
    pacer: Arc<RequestPacer>,
}

impl SireneClient {
    /// Create a client with the default endpoint and pacing
    pub fn new(api_key: String, user_agent: &str) -> MatchResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| MatchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: SIRENE_BASE_URL.to_string(),
            api_key,
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
            pacer: Arc::new(RequestPacer::from_millis(RATE_LIMIT_MS)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a pacer shared with other clients of the same registry
    pub fn with_pacer(mut self, pacer: Arc<RequestPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_results_per_query(mut self, results: u32) -> Self {
        self.results_per_query = results;
        self
    }

    /// Search establishments matching a query
    ///
    /// HTTP 404 is the registry's "no results" answer and yields an empty
    /// list.
    pub async fn search_establishments(&self, query: &SireneQuery) -> MatchResult<Vec<MatchCandidate>> {
        self.pacer.wait().await;

        let q = query.to_string();
        let nombre = self.results_per_query.to_string();

        tracing::debug!(query = %q, url = %self.base_url, "Querying Sirene API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("q", q.as_str()), ("nombre", nombre.as_str())])
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MatchError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Sirene API responded");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MatchError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::debug!(error = %error_text, "Sirene API error body");
            return Err(MatchError::RegistryUnavailable {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MatchError::Network(e.to_string()))?;
        let candidates = parse_search_response(&body)?;

        tracing::debug!(results = candidates.len(), "Sirene results found");

        Ok(candidates)
    }
}

#[async_trait]
impl RegistrySearch for SireneClient {
    async fn search(&self, query: &SireneQuery) -> MatchResult<Vec<MatchCandidate>> {
        self.search_establishments(query).await
    }
}
