//! Application Configuration Module
//!
//! This module centralizes the configuration for the mission service.
//! It loads settings from environment variables and provides a single
//! struct that the entry point turns into services and session settings.

use duo_core::auth::DEMO_LOGIN_LATENCY;
use duo_core::daily::DAILY_FETCH_LATENCY;
use duo_core::scoring::ANALYSIS_DELAY;
use duo_core::session::{AUTO_ADVANCE_DELAY, PASS_THRESHOLD, SessionSettings};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Default per-word speaking time of the console speech engine.
pub const SPEECH_WORD_MS: u64 = 250;
/// Largest accepted `SPEECH_WORD_MS`.
pub const MAX_SPEECH_WORD_MS: u64 = 10_000;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: Level,
    /// When set, the daily mission is fetched over HTTP instead of simulated.
    pub daily_content_url: Option<String>,
    pub daily_latency: Duration,
    pub login_latency: Duration,
    pub analysis_delay: Duration,
    pub auto_advance_delay: Duration,
    pub speech_word: Duration,
    pub pass_threshold: u8,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("PASS_THRESHOLD must be between 0 and 100, got {0}")]
    ThresholdOutOfRange(u8),
    #[error("SPEECH_WORD_MS must be at most 10000, got {0}")]
    SpeechWordOutOfRange(u64),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    // *   `DAILY_CONTENT_URL`: (Optional) Endpoint serving the trending topic as JSON.
    // *   `DAILY_LATENCY_MS`, `LOGIN_LATENCY_MS`, `ANALYSIS_DELAY_MS`,
    //     `AUTO_ADVANCE_DELAY_MS`, `SPEECH_WORD_MS`: (Optional) Simulated latencies.
    // *   `PASS_THRESHOLD`: (Optional) Minimum score counted as a success. Defaults to 80.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let daily_content_url = lookup("DAILY_CONTENT_URL").filter(|url| !url.trim().is_empty());

        let millis = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse(&lookup, var)?.map_or(default, Duration::from_millis))
        };

        let pass_threshold = parse(&lookup, "PASS_THRESHOLD")?.unwrap_or(PASS_THRESHOLD);
        if pass_threshold > 100 {
            return Err(ConfigError::ThresholdOutOfRange(pass_threshold));
        }

        let speech_word_ms = parse(&lookup, "SPEECH_WORD_MS")?.unwrap_or(SPEECH_WORD_MS);
        if speech_word_ms > MAX_SPEECH_WORD_MS {
            return Err(ConfigError::SpeechWordOutOfRange(speech_word_ms));
        }

        Ok(Self {
            log_level,
            daily_content_url,
            daily_latency: millis("DAILY_LATENCY_MS", DAILY_FETCH_LATENCY)?,
            login_latency: millis("LOGIN_LATENCY_MS", DEMO_LOGIN_LATENCY)?,
            analysis_delay: millis("ANALYSIS_DELAY_MS", ANALYSIS_DELAY)?,
            auto_advance_delay: millis("AUTO_ADVANCE_DELAY_MS", AUTO_ADVANCE_DELAY)?,
            speech_word: Duration::from_millis(speech_word_ms),
            pass_threshold,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            auto_advance_delay: self.auto_advance_delay,
            pass_threshold: self.pass_threshold,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
