use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use autocat_categorize::{CategorizerSettings, OpenAiConfig, DEFAULT_TEMPLATE};
use autocat_core::DEFAULT_CONFIDENCE_THRESHOLD;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ledger_path: PathBuf,
    pub enable_search: bool,
    pub search_request_delay: Duration,
    pub search_result_limit: usize,
    pub search_timeout: Duration,
    pub prompt_template: String,
    pub confidence_threshold: f64,
    pub model: OpenAiConfig,
    pub model_timeout: Duration,
    pub log_file: PathBuf,
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads the vars.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model_name = get("MODEL_NAME").ok_or(ConfigError::Missing("MODEL_NAME"))?;
        let search_request_delay: f64 = parse_or(&get, "SEARCH_REQUEST_DELAY", 5.0)?;
        let search_request_delay = Duration::try_from_secs_f64(search_request_delay).map_err(|e| {
            ConfigError::Invalid {
                key: "SEARCH_REQUEST_DELAY",
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            ledger_path: get("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ledger.db")),
            enable_search: get("ENABLE_SEARCH")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            search_request_delay,
            search_result_limit: parse_or(&get, "SEARCH_RESULT_LIMIT", 3)?,
            search_timeout: timeout_secs_or(&get, "SEARCH_TIMEOUT_SECS", 15)?,
            prompt_template: get("PROMPT_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            confidence_threshold: parse_or(
                &get,
                "CONFIDENCE_THRESHOLD",
                DEFAULT_CONFIDENCE_THRESHOLD,
            )?,
            model: OpenAiConfig {
                base_url: get("MODEL_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:11434/v1".to_string()),
                model: model_name,
                api_key: get("MODEL_API_KEY"),
                structured_output: parse_bool_or(&get, "MODEL_STRUCTURED_OUTPUT", true)?,
            },
            model_timeout: timeout_secs_or(&get, "MODEL_TIMEOUT_SECS", 120)?,
            log_file: get("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("transaction_categorization.log")),
            dry_run: parse_bool_or(&get, "DRY_RUN", false)?,
        })
    }

    pub fn categorizer_settings(&self) -> CategorizerSettings {
        CategorizerSettings {
            enable_search: self.enable_search,
            search_result_limit: self.search_result_limit,
            model_timeout: self.model_timeout,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// A zero timeout would fail every call before it starts.
fn timeout_secs_or<G>(get: &G, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse_or(get, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            reason: "timeout must be at least one second".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool_or<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{v}'"),
        }),
        None => Ok(default),
    }
}
