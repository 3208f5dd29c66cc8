//! Configuration layer: typed settings with layered precedence (file → env).

use std::path::Path;
use std::str::FromStr;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "trama";
const DEFAULT_CACHE_ENTRY_LIMIT: usize = 1024;
const DEFAULT_CACHE_INDEX_TTL_SECS: u64 = 2_592_000;
const DEFAULT_MAX_BIND_DEPTH: usize = 64;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub binder: BinderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub entry_limit: usize,
    pub index_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct BinderSettings {
    pub max_bind_depth: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (files → environment →
/// optional explicit file).
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("TRAMA").separator("__"));

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    binder: RawBinderSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    entry_limit: Option<usize>,
    index_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBinderSettings {
    max_bind_depth: Option<usize>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let level = match raw.logging.level.as_deref() {
            Some(value) => LevelFilter::from_str(value)
                .map_err(|_| LoadError::invalid("logging.level", format!("unknown level `{value}`")))?,
            None => LevelFilter::INFO,
        };
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        let max_bind_depth = raw.binder.max_bind_depth.unwrap_or(DEFAULT_MAX_BIND_DEPTH);
        if max_bind_depth == 0 {
            return Err(LoadError::invalid(
                "binder.max_bind_depth",
                "must be at least 1",
            ));
        }

        Ok(Self {
            logging: LoggingSettings { level, format },
            cache: CacheSettings {
                enabled: raw.cache.enabled.unwrap_or(true),
                entry_limit: raw.cache.entry_limit.unwrap_or(DEFAULT_CACHE_ENTRY_LIMIT),
                index_ttl_secs: raw
                    .cache
                    .index_ttl_secs
                    .unwrap_or(DEFAULT_CACHE_INDEX_TTL_SECS),
            },
            binder: BinderSettings { max_bind_depth },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_raw() {
        let settings = Settings::from_raw(RawSettings::default()).expect("defaults");
        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert!(matches!(settings.logging.format, LogFormat::Compact));
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.entry_limit, DEFAULT_CACHE_ENTRY_LIMIT);
        assert_eq!(settings.cache.index_ttl_secs, DEFAULT_CACHE_INDEX_TTL_SECS);
        assert_eq!(settings.binder.max_bind_depth, DEFAULT_MAX_BIND_DEPTH);
    }

    #[test]
    fn level_and_format_parse() {
        let raw = RawSettings {
            logging: RawLoggingSettings {
                level: Some("debug".to_string()),
                json: Some(true),
            },
            ..Default::default()
        };
        let settings = Settings::from_raw(raw).expect("parsed");
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn unknown_level_is_invalid() {
        let raw = RawSettings {
            logging: RawLoggingSettings {
                level: Some("chatty".to_string()),
                json: None,
            },
            ..Default::default()
        };
        let err = Settings::from_raw(raw).expect_err("invalid level");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "logging.level",
                ..
            }
        ));
    }

    #[test]
    fn zero_bind_depth_is_invalid() {
        let raw = RawSettings {
            binder: RawBinderSettings {
                max_bind_depth: Some(0),
            },
            ..Default::default()
        };
        let err = Settings::from_raw(raw).expect_err("invalid depth");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "binder.max_bind_depth",
                ..
            }
        ));
    }
}
