//! Configuration resolution for ftt-siren
//!
//! Each setting resolves from the command line / environment first, then the
//! TOML file, then a compiled default. Missing credentials are collected and
//! reported together before any network call is made.

use crate::error::{MatchError, MatchResult};
use crate::services::sirene_client::{DEFAULT_RESULTS_PER_QUERY, RATE_LIMIT_MS, SIRENE_BASE_URL};
use ftt_common::config::{resolve_setting, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COUNTRY: &str = "France";

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub insee_api_key: Option<String>,
    pub sirene_url: Option<String>,
    pub rate_limit_ms: Option<u64>,
    pub country: Option<String>,
    pub sqlite_path: Option<PathBuf>,
}

/// Which datastore backend to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Rest { url: String, service_key: String },
    Sqlite { path: PathBuf },
}

/// Fully resolved matcher settings
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub store: StoreConfig,
    pub insee_api_key: String,
    pub sirene_url: String,
    pub rate_limit: Duration,
    pub results_per_query: u32,
    pub country: String,
}

impl MatcherConfig {
    /// Resolve every setting
    ///
    /// # Errors
    /// `Configuration` listing every missing credential.
    pub fn resolve(overrides: &ConfigOverrides, toml: &TomlConfig) -> MatchResult<Self> {
        let mut errors = Vec::new();

        let insee_api_key = resolve_setting(
            "INSEE API key",
            overrides.insee_api_key.as_deref(),
            toml.insee_api_key.as_deref(),
        )
        .map(|(key, _)| key);
        if insee_api_key.is_none() {
            errors.push("INSEE_API_KEY environment variable is required".to_string());
        }

        let sqlite_path = overrides.sqlite_path.clone().or_else(|| toml.sqlite_path.clone());
        let store = match sqlite_path {
            Some(path) => Some(StoreConfig::Sqlite { path }),
            None => {
                let url = resolve_setting(
                    "Supabase URL",
                    overrides.supabase_url.as_deref(),
                    toml.supabase_url.as_deref(),
                );
                let service_key = resolve_setting(
                    "Supabase service key",
                    overrides.supabase_service_key.as_deref(),
                    toml.supabase_service_key.as_deref(),
                );
                if url.is_none() {
                    errors.push("SUPABASE_URL environment variable is required".to_string());
                }
                if service_key.is_none() {
                    errors.push("SUPABASE_SERVICE_KEY environment variable is required".to_string());
                }
                match (url, service_key) {
                    (Some((url, _)), Some((service_key, _))) => Some(StoreConfig::Rest { url, service_key }),
                    _ => None,
                }
            }
        };

        let (store, insee_api_key) = match (store, insee_api_key) {
            (Some(store), Some(key)) if errors.is_empty() => (store, key),
            _ => return Err(MatchError::Configuration(errors.join("; "))),
        };

        let sirene_url = overrides
            .sirene_url
            .clone()
            .or_else(|| toml.sirene_url.clone())
            .unwrap_or_else(|| SIRENE_BASE_URL.to_string());

        let rate_limit_ms = overrides
            .rate_limit_ms
            .or(toml.rate_limit_ms)
            .unwrap_or(RATE_LIMIT_MS);

        let country = overrides
            .country
            .clone()
            .or_else(|| toml.country.clone())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        Ok(Self {
            store,
            insee_api_key,
            sirene_url,
            rate_limit: Duration::from_millis(rate_limit_ms),
            results_per_query: toml.results_per_query.unwrap_or(DEFAULT_RESULTS_PER_QUERY),
            country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest_overrides() -> ConfigOverrides {
        ConfigOverrides {
            supabase_url: Some("https://example.supabase.co".into()),
            supabase_service_key: Some("service".into()),
            insee_api_key: Some("insee".into()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = MatcherConfig::resolve(&rest_overrides(), &TomlConfig::default()).unwrap();
        assert_eq!(config.sirene_url, SIRENE_BASE_URL);
        assert_eq!(config.rate_limit, Duration::from_millis(2100));
        assert_eq!(config.results_per_query, 10);
        assert_eq!(config.country, "France");
        assert_eq!(
            config.store,
            StoreConfig::Rest {
                url: "https://example.supabase.co".into(),
                service_key: "service".into()
            }
        );
    }

    #[test]
    fn test_all_missing_credentials_reported() {
        let err = MatcherConfig::resolve(&ConfigOverrides::default(), &TomlConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, MatchError::Configuration(_)));
        assert!(message.contains("INSEE_API_KEY"));
        assert!(message.contains("SUPABASE_URL"));
        assert!(message.contains("SUPABASE_SERVICE_KEY"));
    }

    #[test]
    fn test_missing_registry_key_only() {
        let overrides = ConfigOverrides {
            insee_api_key: None,
            ..rest_overrides()
        };
        let message = MatcherConfig::resolve(&overrides, &TomlConfig::default())
            .unwrap_err()
            .to_string();
        assert!(message.contains("INSEE_API_KEY"));
        assert!(!message.contains("SUPABASE"));
    }

    #[test]
    fn test_sqlite_backend_needs_no_supabase_credentials() {
        let overrides = ConfigOverrides {
            insee_api_key: Some("insee".into()),
            sqlite_path: Some(PathBuf::from("/tmp/companies.db")),
            ..ConfigOverrides::default()
        };
        let config = MatcherConfig::resolve(&overrides, &TomlConfig::default()).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("/tmp/companies.db")
            }
        );
    }

    #[test]
    fn test_toml_fills_gaps_and_overrides_win() {
        let toml = TomlConfig {
            insee_api_key: Some("toml-key".into()),
            supabase_url: Some("https://toml.supabase.co".into()),
            supabase_service_key: Some("toml-service".into()),
            rate_limit_ms: Some(3000),
            results_per_query: Some(20),
            country: Some("Belgique".into()),
            ..TomlConfig::default()
        };
        let overrides = ConfigOverrides {
            rate_limit_ms: Some(2500),
            ..ConfigOverrides::default()
        };

        let config = MatcherConfig::resolve(&overrides, &toml).unwrap();
        assert_eq!(config.insee_api_key, "toml-key");
        assert_eq!(config.rate_limit, Duration::from_millis(2500));
        assert_eq!(config.results_per_query, 20);
        assert_eq!(config.country, "Belgique");
    }
}
