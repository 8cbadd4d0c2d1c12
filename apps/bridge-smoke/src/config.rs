//! Environment-backed settings for `rtmp-bridge-smoke`.

use std::{env, fs, io, path::PathBuf, time::Duration};

use rtmp_bridge_core::{PlayerConfig, PublisherConfig};
use thiserror::Error;

const DEFAULT_URL: &str = "rtmp://127.0.0.1/live/smoke";
const DEFAULT_STEP_DELAY_MS: u64 = 200;
const DEFAULT_EVENT_TIMEOUT_MS: u64 = 5_000;

/// Runtime settings of the smoke runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Publish target; used when the publisher JSON has no `url`.
    pub publish_url: String,
    /// Playback source; defaults to the publish target.
    pub play_url: String,
    /// Optional JSON prop bag for the publisher session.
    pub publisher_config_path: Option<PathBuf>,
    /// Client license handed to the engine factory.
    pub license: Option<String>,
    /// Delay between simulated engine events.
    pub step_delay_ms: u64,
    /// Upper bound when waiting for one state.
    pub event_timeout_ms: u64,
    /// Make the simulated player time out instead of connecting.
    pub fail_player: bool,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let publish_url = optional_trimmed_env("RTMP_BRIDGE_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_URL.to_owned());
        let play_url = optional_trimmed_env("RTMP_BRIDGE_PLAYER_URL", &mut lookup)
            .unwrap_or_else(|| publish_url.clone());
        let publisher_config_path =
            optional_trimmed_env("RTMP_BRIDGE_PUBLISHER_CONFIG", &mut lookup).map(PathBuf::from);
        let license = optional_trimmed_env("RTMP_BRIDGE_LICENSE", &mut lookup);

        let step_delay_ms =
            parse_u64_with_default("RTMP_BRIDGE_STEP_DELAY_MS", DEFAULT_STEP_DELAY_MS, &mut lookup)?;
        let event_timeout_ms = parse_u64_with_default(
            "RTMP_BRIDGE_EVENT_TIMEOUT_MS",
            DEFAULT_EVENT_TIMEOUT_MS,
            &mut lookup,
        )?;
        let fail_player = parse_flag("RTMP_BRIDGE_FAIL_PLAYER", &mut lookup)?;

        if event_timeout_ms <= step_delay_ms.saturating_mul(3) {
            return Err(ConfigError::InvalidValue {
                key: "RTMP_BRIDGE_EVENT_TIMEOUT_MS",
                value: event_timeout_ms.to_string(),
                reason: "must exceed three simulated steps".to_owned(),
            });
        }

        Ok(Self {
            publish_url,
            play_url,
            publisher_config_path,
            license,
            step_delay_ms,
            event_timeout_ms,
            fail_player,
        })
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }

    /// Publisher props, read from the JSON file when one is configured.
    pub fn publisher_config(&self) -> Result<PublisherConfig, ConfigError> {
        let mut config = match &self.publisher_config_path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str::<PublisherConfig>(&raw).map_err(|source| {
                    ConfigError::ParseFile {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            None => PublisherConfig::default(),
        };
        if config.url.trim().is_empty() {
            config.url = self.publish_url.clone();
        }
        config.debug = true;
        Ok(config)
    }

    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            debug: true,
            ..PlayerConfig::new(self.play_url.clone())
        }
    }
}

/// Errors produced while loading smoke settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse publisher props in {path:?}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_u64_with_default<F>(key: &'static str, default: u64, lookup: &mut F) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    value.parse::<u64>().map_err(|err| ConfigError::InvalidValue {
        key,
        value: value.clone(),
        reason: err.to_string(),
    })
}

fn parse_flag<F>(key: &'static str, lookup: &mut F) -> Result<bool, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean".to_owned(),
        }),
    }
}
