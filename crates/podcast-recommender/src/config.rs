use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 8_000;

/// Application configuration loaded from environment variables.
///
/// Everything is optional. Without `REDIS_URL` conversations are not persisted; without
/// `PODCAST_CATALOG_PATH` the compiled-in catalog is used.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL for chat history. `None` disables persistence.
    pub redis_url: Option<String>,
    /// Replacement catalog document.
    pub catalog_path: Option<PathBuf>,
    /// Model ID sent to the chat completion endpoint.
    pub model: String,
    /// Upper bound on one phrasing call, retries included.
    pub generation_timeout: Duration,
    pub stream_completions: bool,
    pub tcp_listen_addr: Option<String>,
    pub http_listen_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `REDIS_URL`
    /// - `PODCAST_CATALOG_PATH`
    /// - `PODPAL_MODEL` (default: "gemini-2.0-flash")
    /// - `PODPAL_GENERATION_TIMEOUT_MS` (default: 8000)
    /// - `PODPAL_STREAM_COMPLETIONS` ("true"/"false", default false)
    /// - `MCP_TCP_LISTEN_ADDR`, `MCP_HTTP_LISTEN_ADDR`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let catalog_path = non_empty("PODCAST_CATALOG_PATH").map(PathBuf::from);
        if let Some(path) = &catalog_path {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "catalog file not found: {}",
                    path.display()
                )));
            }
        }

        let generation_timeout = match non_empty("PODPAL_GENERATION_TIMEOUT_MS") {
            Some(raw) => {
                let ms = raw.parse::<u64>().ok().filter(|&ms| ms > 0).ok_or_else(|| {
                    AppError::Config(format!(
                        "PODPAL_GENERATION_TIMEOUT_MS must be a positive integer, got '{raw}'"
                    ))
                })?;
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_GENERATION_TIMEOUT_MS),
        };

        let stream_completions = match non_empty("PODPAL_STREAM_COMPLETIONS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                AppError::Config(format!(
                    "PODPAL_STREAM_COMPLETIONS must be true or false, got '{raw}'"
                ))
            })?,
            None => false,
        };

        let tcp_listen_addr = non_empty("MCP_TCP_LISTEN_ADDR");
        let http_listen_addr = non_empty("MCP_HTTP_LISTEN_ADDR");
        if tcp_listen_addr.is_some() && http_listen_addr.is_some() {
            return Err(AppError::Config(
                "set only one of MCP_TCP_LISTEN_ADDR and MCP_HTTP_LISTEN_ADDR".to_string(),
            ));
        }

        Ok(Self {
            redis_url: non_empty("REDIS_URL"),
            catalog_path,
            model: non_empty("PODPAL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generation_timeout,
            stream_completions,
            tcp_listen_addr,
            http_listen_addr,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert!(config.redis_url.is_none());
        assert!(config.catalog_path.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.generation_timeout, Duration::from_millis(8_000));
        assert!(!config.stream_completions);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("PODPAL_MODEL", "gpt-4o-mini"),
            ("PODPAL_GENERATION_TIMEOUT_MS", "2500"),
            ("PODPAL_STREAM_COMPLETIONS", "TRUE"),
            ("MCP_HTTP_LISTEN_ADDR", "0.0.0.0:8080"),
        ])
        .unwrap();
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.generation_timeout, Duration::from_millis(2_500));
        assert!(config.stream_completions);
        assert_eq!(config.http_listen_addr.as_deref(), Some("0.0.0.0:8080"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("REDIS_URL", "  "), ("PODPAL_MODEL", "")]).unwrap();
        assert!(config.redis_url.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(matches!(
            load(&[("PODPAL_GENERATION_TIMEOUT_MS", "soon")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            load(&[("PODPAL_GENERATION_TIMEOUT_MS", "0")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn rejects_bad_bool() {
        assert!(matches!(
            load(&[("PODPAL_STREAM_COMPLETIONS", "maybe")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn rejects_missing_catalog_file() {
        let err = load(&[("PODCAST_CATALOG_PATH", "/definitely/not/here.json")]).unwrap_err();
        assert!(err.to_string().contains("catalog file not found"));
    }

    #[test]
    fn rejects_two_listeners() {
        assert!(matches!(
            load(&[
                ("MCP_TCP_LISTEN_ADDR", "127.0.0.1:9000"),
                ("MCP_HTTP_LISTEN_ADDR", "127.0.0.1:9001"),
            ]),
            Err(AppError::Config(_))
        ));
    }
}
