use std::env;
use std::time::Duration;

use gateway_upstream::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 6;
const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub upstream_connect_timeout: Duration,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            upstream_connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECONDS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset, blank or unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let seconds = |key: &str, default: u64| {
            Duration::from_secs(
                text(key)
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(default),
            )
        };
        let defaults = Self::default();

        Self {
            bind: text("GATEWAY_BIND").unwrap_or(defaults.bind),
            gemini_model: text("GATEWAY_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: text("GATEWAY_GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            upstream_connect_timeout: seconds(
                "GATEWAY_UPSTREAM_CONNECT_TIMEOUT_SECONDS",
                DEFAULT_CONNECT_TIMEOUT_SECONDS,
            ),
            upstream_timeout: seconds(
                "GATEWAY_UPSTREAM_TIMEOUT_SECONDS",
                DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
            ),
            max_body_bytes: text("GATEWAY_MAX_BODY_BYTES")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_values_keep_defaults() {
        assert_eq!(ApiConfig::from_lookup(|_| None), ApiConfig::default());
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let vars = HashMap::from([
            ("GATEWAY_BIND", "127.0.0.1:9000"),
            ("GATEWAY_GEMINI_MODEL", "gemini-2.5-pro"),
            ("GATEWAY_UPSTREAM_TIMEOUT_SECONDS", "30"),
            ("GATEWAY_MAX_BODY_BYTES", "lots"),
        ]);
        let config =
            ApiConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.gemini_model, "gemini-2.5-pro");
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
    }
}
