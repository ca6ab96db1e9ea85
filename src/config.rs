//! Application-level configuration loading: room pacing defaults, retry policies and the
//! question source credentials.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use rand::Rng;
use serde::Deserialize;
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::state::room::PacingConfig;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HAYAOSHI_BACK_CONFIG_PATH";
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const GEMINI_MODEL_ENV: &str = "GEMINI_MODEL";
const GEMINI_ENDPOINT_ENV: &str = "GEMINI_ENDPOINT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Configuration every new room starts with.
    pub pacing: PacingConfig,
    /// Backoff of the background refill loop.
    pub refill: Backoff,
    /// Retry budget of synchronous generation calls.
    pub generation: GenerationBudget,
    /// Question source endpoint and credentials.
    pub source: SourceConfig,
    /// Room lifecycle.
    pub rooms: RoomsConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.source.apply_env();
        config
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Exponential backoff with random jitter: `min(max, initial * 2^(attempt-1)) + rand(0..jitter)`.
pub struct Backoff {
    #[serde(rename = "initial_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    /// Delay after the first failure.
    pub initial: Duration,
    #[serde(rename = "max_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    /// Upper bound of the exponential part.
    pub max: Duration,
    #[serde(rename = "jitter_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    /// Exclusive upper bound of the random extra delay.
    pub jitter: Duration,
}

impl Backoff {
    /// Deterministic part of the delay after the `attempt`-th failure (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial
            .saturating_mul(1u32 << exponent)
            .min(self.max)
    }

    /// Full delay after the `attempt`-th failure, jitter included.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..jitter_ms)
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1_000),
            max: Duration::from_millis(30_000),
            jitter: Duration::from_millis(1_000),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Bounded retry budget for generation calls a caller waits on.
pub struct GenerationBudget {
    /// Maximum number of source calls.
    pub max_attempts: u32,
    #[serde(rename = "total_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    /// Wall-clock limit across all attempts.
    pub total: Duration,
    /// Delay between attempts.
    pub backoff: Backoff,
}

impl Default for GenerationBudget {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            total: Duration::from_secs(60),
            backoff: Backoff {
                initial: Duration::from_millis(1_000),
                max: Duration::from_millis(16_000),
                jitter: Duration::from_millis(500),
            },
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
/// Settings of the Gemini question source.
pub struct SourceConfig {
    /// Model identifier.
    pub model: String,
    /// Base URL of the Generative Language API.
    pub endpoint: String,
    /// API key; without one the source runs unconfigured.
    pub api_key: Option<String>,
}

impl SourceConfig {
    fn apply_env(&mut self) {
        if let Some(key) = non_empty_env(GEMINI_API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty_env(GEMINI_MODEL_ENV) {
            self.model = model;
        }
        if let Some(endpoint) = non_empty_env(GEMINI_ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
/// Room lifecycle settings.
pub struct RoomsConfig {
    #[serde(rename = "idle_eviction_secs")]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    /// Evict rooms idle for this long; `None` keeps rooms until exit.
    pub idle_eviction: Option<Duration>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.pacing.interval, Duration::from_millis(10_000));
        assert_eq!(config.pacing.reveal, Duration::from_millis(3_000));
        assert_eq!(config.pacing.refill_threshold, 2);
        assert_eq!(config.pacing.refill_count, 5);
        assert_eq!(config.generation.max_attempts, 8);
        assert_eq!(config.refill.max, Duration::from_secs(30));
        assert!(config.rooms.idle_eviction.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let raw = r#"{
            "pacing": { "interval_ms": 5000, "topic": "history" },
            "refill": { "initial_ms": 200 },
            "rooms": { "idle_eviction_secs": 600 }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.pacing.interval, Duration::from_millis(5_000));
        assert_eq!(config.pacing.topic, "history");
        assert_eq!(config.pacing.reveal, Duration::from_millis(3_000));
        assert_eq!(config.refill.initial, Duration::from_millis(200));
        assert_eq!(config.refill.max, Duration::from_millis(30_000));
        assert_eq!(config.rooms.idle_eviction, Some(Duration::from_secs(600)));
        assert_eq!(config.source.model, "gemini-2.5-flash");
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let backoff = Backoff::default();
        assert_eq!(backoff.base_delay(1), Duration::from_secs(1));
        assert_eq!(backoff.base_delay(2), Duration::from_secs(2));
        assert_eq!(backoff.base_delay(5), Duration::from_secs(16));
        assert_eq!(backoff.base_delay(6), Duration::from_secs(30));
        assert_eq!(backoff.base_delay(64), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let backoff = Backoff::default();
        for _ in 0..32 {
            let delay = backoff.delay(3);
            assert!(delay >= Duration::from_secs(4));
            assert!(delay < Duration::from_secs(5));
        }
        let no_jitter = Backoff {
            jitter: Duration::ZERO,
            ..Backoff::default()
        };
        assert_eq!(no_jitter.delay(1), Duration::from_secs(1));
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let source = SourceConfig {
            api_key: Some("secret".into()),
            ..SourceConfig::default()
        };
        let rendered = format!("{source:?}");
        assert!(!rendered.contains("secret"));
    }
}
