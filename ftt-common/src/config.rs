//! Configuration file loading and tiered setting resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line flag or environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback, owned by each tool)

use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FTT_CONFIG";

/// Logging section of the TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `<config_dir>/ftt/<tool>.toml`
///
/// Every field is optional; a missing file yields `TomlConfig::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub insee_api_key: Option<String>,
    pub sirene_url: Option<String>,
    pub rate_limit_ms: Option<u64>,
    pub results_per_query: Option<u32>,
    pub country: Option<String>,
    pub sqlite_path: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        debug!("Loaded config file {}", path.display());
        Ok(config)
    }
}

/// Default config file location for a tool
pub fn default_config_path(tool: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ftt").join(format!("{}.toml", tool)))
}

/// Outcome of config file discovery
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// Explicitly requested file that does not exist; defaults were used
    ///
    /// Loading happens before logging is initialised, so reporting it is
    /// left to the caller.
    pub missing_file: Option<PathBuf>,
}

/// Load the TOML config for a tool
///
/// An explicit path (argument, then `FTT_CONFIG`) wins over the default
/// location. Missing files are not errors: defaults are returned, and an
/// explicitly requested file that is missing is reported in
/// [`LoadedConfig::missing_file`]. Unparseable files are errors.
pub fn load_toml_config(explicit: Option<&Path>, tool: &str) -> Result<LoadedConfig> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    if let Some(path) = requested {
        if !path.exists() {
            return Ok(LoadedConfig {
                config: TomlConfig::default(),
                missing_file: Some(path),
            });
        }
        return Ok(LoadedConfig {
            config: TomlConfig::load(&path)?,
            missing_file: None,
        });
    }

    let config = match default_config_path(tool) {
        Some(path) if path.exists() => TomlConfig::load(&path)?,
        _ => TomlConfig::default(),
    };
    Ok(LoadedConfig {
        config,
        missing_file: None,
    })
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    /// Command-line flag or environment variable
    Environment,
    /// TOML config file
    Toml,
}

impl SettingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingSource::Environment => "environment",
            SettingSource::Toml => "TOML",
        }
    }
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a string setting from its two configurable tiers
///
/// Blank values are ignored. When both tiers hold a value the environment
/// wins and a warning is logged, since that usually means a stale file.
pub fn resolve_setting(
    name: &str,
    env_value: Option<&str>,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    let env_value = env_value.filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment, TOML. Using environment (highest priority).",
            name
        );
    }

    let resolved = env_value
        .map(|v| (v.trim().to_string(), SettingSource::Environment))
        .or_else(|| toml_value.map(|v| (v.trim().to_string(), SettingSource::Toml)));

    if let Some((_, source)) = &resolved {
        info!("{} loaded from {}", name, source.as_str());
    }
    resolved
}

/// Standard user-agent for outbound HTTP clients
pub fn get_user_agent(tool: &str, version: &str) -> String {
    format!("{}/{} (french-tech-funding-tracker)", tool, version)
}
