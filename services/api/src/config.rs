//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::FixedOffset;
use exam_prep_core::QuizSettings;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Upper bound for `SESSION_TTL_MINUTES`: one year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 525_600;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// The only bearer token the server accepts.
    pub auth_token: String,
    /// Phone number returned by `validate` for the bearer token.
    pub my_number: String,
    pub openai_api_key: Option<String>,
    pub time_parser_base_url: Option<String>,
    pub time_parser_model: String,
    pub time_parser_timeout: Duration,
    /// How long a generated quiz can be graded. At most `MAX_SESSION_TTL_MINUTES`.
    pub session_ttl: chrono::Duration,
    pub sweep_interval: Duration,
    pub day_offset: FixedOffset,
    pub seed_sample_data: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Load Server and Database Settings ---
        let bind_address = parse_or(&var, "BIND_ADDRESS", "0.0.0.0:8086".parse::<SocketAddr>())?;
        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://exam_prep.db".to_string());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Bearer Credentials (required, fail closed) ---
        let auth_token = required("AUTH_TOKEN")?;
        let my_number = required("MY_NUMBER")?;

        // --- Load Time Parser Settings ---
        let openai_api_key = var("OPENAI_API_KEY");
        let time_parser_base_url = var("TIME_PARSER_BASE_URL");
        let time_parser_model =
            var("TIME_PARSER_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let time_parser_timeout =
            Duration::from_secs(positive(&var, "TIME_PARSER_TIMEOUT_SECS", 10)?);

        // --- Load Quiz and Background Settings ---
        let ttl_minutes = positive(&var, "SESSION_TTL_MINUTES", 1440)?;
        let session_ttl = i64::try_from(ttl_minutes)
            .ok()
            .filter(|m| *m <= MAX_SESSION_TTL_MINUTES)
            .and_then(chrono::Duration::try_minutes)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SESSION_TTL_MINUTES".to_string(),
                    format!("must be at most {MAX_SESSION_TTL_MINUTES} minutes"),
                )
            })?;
        let sweep_interval = Duration::from_secs(positive(&var, "SWEEP_INTERVAL_SECS", 60)?);

        let offset_minutes: i32 = parse_or(&var, "DAY_OFFSET_MINUTES", Ok::<i32, Infallible>(0))?;
        let day_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DAY_OFFSET_MINUTES".to_string(),
                    format!("{offset_minutes} minutes is not a valid UTC offset"),
                )
            })?;

        let seed_sample_data = match var("SEED_SAMPLE_DATA") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SEED_SAMPLE_DATA".to_string(),
                    format!("'{raw}' is not a boolean"),
                )
            })?,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            auth_token,
            my_number,
            openai_api_key,
            time_parser_base_url,
            time_parser_model,
            time_parser_timeout,
            session_ttl,
            sweep_interval,
            day_offset,
            seed_sample_data,
        })
    }

    /// Settings handed to the quiz components.
    pub fn quiz_settings(&self) -> QuizSettings {
        QuizSettings {
            session_ttl: self.session_ttl,
            day_offset: self.day_offset,
        }
    }
}

/// Parses `key` if present, otherwise returns `default`.
fn parse_or<T, E>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Result<T, E>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}

fn positive(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let value: u64 = parse_or(var, key, Ok::<u64, Infallible>(default))?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
