//! Unit tests for configuration loading and setting resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate FTT_CONFIG are marked with #[serial].

use ftt_common::config::{
    is_valid_key, load_toml_config, resolve_setting, SettingSource, TomlConfig,
    CONFIG_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("ftt-siren.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_toml_config_parses_all_fields() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
supabase_url = "https://example.supabase.co"
supabase_service_key = "service-key"
insee_api_key = "insee-key"
rate_limit_ms = 500
results_per_query = 5
country = "France"
sqlite_path = "/tmp/companies.db"

[logging]
level = "debug"
"#,
    );

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.supabase_url.as_deref(), Some("https://example.supabase.co"));
    assert_eq!(config.supabase_service_key.as_deref(), Some("service-key"));
    assert_eq!(config.insee_api_key.as_deref(), Some("insee-key"));
    assert_eq!(config.rate_limit_ms, Some(500));
    assert_eq!(config.results_per_query, Some(5));
    assert_eq!(config.country.as_deref(), Some("France"));
    assert!(config.sqlite_path.is_some());
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_toml_config_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "insee_api_key = \"abc\"\n");

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.insee_api_key.as_deref(), Some("abc"));
    assert!(config.supabase_url.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_toml_config_invalid_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "rate_limit_ms = \"not a number\"\n");

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let loaded = load_toml_config(Some(&missing), "ftt-siren").unwrap();
    assert!(loaded.config.insee_api_key.is_none());
    assert_eq!(loaded.missing_file, Some(missing));
}

#[test]
#[serial]
fn test_missing_env_var_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("from-env.toml");
    env::set_var(CONFIG_ENV_VAR, &missing);

    let loaded = load_toml_config(None, "ftt-siren").unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(loaded.missing_file, Some(missing));
    assert!(loaded.config.country.is_none());
}

#[test]
#[serial]
fn test_env_var_selects_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "country = \"Belgique\"\n");
    env::set_var(CONFIG_ENV_VAR, &path);

    let loaded = load_toml_config(None, "ftt-siren").unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(loaded.config.country.as_deref(), Some("Belgique"));
    assert!(loaded.missing_file.is_none());
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let dir = TempDir::new().unwrap();
    let env_path = dir.path().join("env.toml");
    fs::write(&env_path, "country = \"Env\"\n").unwrap();
    let explicit = dir.path().join("explicit.toml");
    fs::write(&explicit, "country = \"Explicit\"\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &env_path);

    let loaded = load_toml_config(Some(&explicit), "ftt-siren").unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(loaded.config.country.as_deref(), Some("Explicit"));
}

#[test]
fn test_is_valid_key() {
    assert!(is_valid_key("abc"));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key("   "));
}

#[test]
fn test_resolve_setting_priority() {
    let resolved = resolve_setting("API key", Some("from-env"), Some("from-toml"));
    assert_eq!(
        resolved,
        Some(("from-env".to_string(), SettingSource::Environment))
    );

    let resolved = resolve_setting("API key", None, Some("from-toml"));
    assert_eq!(resolved, Some(("from-toml".to_string(), SettingSource::Toml)));

    // Blank environment value does not shadow TOML
    let resolved = resolve_setting("API key", Some("  "), Some("from-toml"));
    assert_eq!(resolved, Some(("from-toml".to_string(), SettingSource::Toml)));

    assert_eq!(resolve_setting("API key", None, None), None);
}
