//! PostgREST (Supabase) backend for the `companies` table

use super::{CompanyStore, MatchTarget, TargetFilter};
use crate::error::{MatchError, MatchResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const COMPANY_COLUMNS: &str = "id,name,hq_city_name,siren,siret";

/// Row shape returned by the select
#[derive(Debug, Deserialize)]
struct CompanyRow {
    id: serde_json::Value,
    name: String,
    hq_city_name: Option<String>,
    siren: Option<String>,
    siret: Option<String>,
}

impl From<CompanyRow> for MatchTarget {
    fn from(row: CompanyRow) -> Self {
        // Ids are uuids on the hosted schema but integers on older copies
        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        MatchTarget {
            id,
            name: row.name,
            city: row.hq_city_name.filter(|c| !c.trim().is_empty()),
            registry_id: row.siren,
            establishment_id: row.siret,
        }
    }
}

#[derive(Debug, Serialize)]
struct IdentifierUpdate<'a> {
    siren: &'a str,
    siret: &'a str,
    updated_at: String,
}

/// Build the PostgREST filter parameters for a target selection
fn select_params(filter: &TargetFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", COMPANY_COLUMNS.to_string()),
        ("hq_country", format!("eq.{}", filter.country)),
        ("order", "name.asc".to_string()),
    ];

    if !filter.include_matched {
        params.push(("siren", "is.null".to_string()));
    }

    if let Some(name) = &filter.name_contains {
        params.push(("name", format!("ilike.*{}*", name)));
    }

    if let Some(limit) = filter.limit {
        params.push(("limit", limit.to_string()));
    }

    params
}

/// Supabase REST datastore
pub struct RestStore {
    http_client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: String, user_agent: &str) -> MatchResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MatchError::Configuration(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    fn companies_url(&self) -> String {
        format!("{}/rest/v1/companies", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", self.service_key.as_str())
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl CompanyStore for RestStore {
    async fn find_unmatched_targets(&self, filter: &TargetFilter) -> MatchResult<Vec<MatchTarget>> {
        let params = select_params(filter);
        tracing::debug!(url = %self.companies_url(), ?params, "Fetching companies");

        let response = self
            .authorized(self.http_client.get(self.companies_url()))
            .query(&params)
            .send()
            .await
            .map_err(|e| MatchError::DatastoreRead(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MatchError::DatastoreRead(format!("{} {}", status.as_u16(), error_text)));
        }

        let rows: Vec<CompanyRow> = response
            .json()
            .await
            .map_err(|e| MatchError::DatastoreRead(e.to_string()))?;

        Ok(rows.into_iter().map(MatchTarget::from).collect())
    }

    async fn write_identifiers(
        &self,
        target_id: &str,
        registry_id: &str,
        establishment_id: &str,
    ) -> MatchResult<()> {
        let update = IdentifierUpdate {
            siren: registry_id,
            siret: establishment_id,
            updated_at: Utc::now().to_rfc3339(),
        };

        // Ask for the updated ids back: a filter matching no row is still a 2xx
        let response = self
            .authorized(self.http_client.patch(self.companies_url()))
            .query(&[("id", format!("eq.{}", target_id)), ("select", "id".to_string())])
            .header("Prefer", "return=representation")
            .json(&update)
            .send()
            .await
            .map_err(|e| MatchError::DatastoreWrite(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MatchError::DatastoreWrite(format!("{} {}", status.as_u16(), error_text)));
        }

        let updated: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| MatchError::DatastoreWrite(e.to_string()))?;
        if updated.is_empty() {
            return Err(MatchError::DatastoreWrite(format!("no company with id {}", target_id)));
        }

        tracing::debug!(id = %target_id, siren = %registry_id, "Company identifiers updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_default_selection_params() {
        let params = select_params(&TargetFilter::default());
        assert_eq!(param(&params, "select"), Some(COMPANY_COLUMNS));
        assert_eq!(param(&params, "hq_country"), Some("eq.France"));
        assert_eq!(param(&params, "order"), Some("name.asc"));
        assert_eq!(param(&params, "siren"), Some("is.null"));
        assert_eq!(param(&params, "name"), None);
        assert_eq!(param(&params, "limit"), None);
    }

    #[test]
    fn test_force_company_and_limit_params() {
        let filter = TargetFilter {
            include_matched: true,
            name_contains: Some("mistral".to_string()),
            limit: Some(5),
            ..TargetFilter::default()
        };
        let params = select_params(&filter);
        assert_eq!(param(&params, "siren"), None);
        assert_eq!(param(&params, "name"), Some("ilike.*mistral*"));
        assert_eq!(param(&params, "limit"), Some("5"));
    }

    #[test]
    fn test_row_conversion() {
        let row: CompanyRow = serde_json::from_str(
            r#"{"id": 42, "name": "Alan", "hq_city_name": "", "siren": null, "siret": null}"#,
        )
        .unwrap();
        let target = MatchTarget::from(row);
        assert_eq!(target.id, "42");
        assert_eq!(target.city, None);
        assert!(!target.is_matched());

        let row: CompanyRow = serde_json::from_str(
            r#"{"id": "2f1c", "name": "Qonto", "hq_city_name": "Paris", "siren": "819489626", "siret": null}"#,
        )
        .unwrap();
        let target = MatchTarget::from(row);
        assert_eq!(target.id, "2f1c");
        assert_eq!(target.city.as_deref(), Some("Paris"));
        assert!(target.is_matched());
    }
}
