//! Client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default, so an empty
//! environment yields a client for `http://localhost:9191/`.

use std::time::Duration;

use crate::domain::{PageContext, RunMode};
use crate::error::ClientError;
use crate::ws::reconnect::BackoffPolicy;

const DEFAULT_PAGE_URL: &str = "http://localhost:9191/";
const STREAMS_API_PATH: &str = "/api/channels/streams/";

/// Top-level client configuration.
///
/// Loaded once at startup via [`ClientConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the page the client runs for. Only its scheme and host
    /// matter for the connection target.
    pub page_url: String,

    /// `ENV_MODE=dev` selects development mode.
    pub mode: RunMode,

    /// Port of the development event server.
    pub dev_ws_port: u16,

    /// Reconnection backoff.
    pub backoff: BackoffPolicy,

    /// Consecutive failures tolerated before giving up. `None` retries
    /// forever.
    pub max_attempts: Option<u32>,

    /// Timeout for opening one connection.
    pub connect_timeout: Duration,

    /// Capacity of the inbound frame queue.
    pub frame_queue_capacity: usize,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Explicit stream listing endpoint. Derived from the page when unset.
    pub streams_api_url: Option<String>,

    /// Bearer token for the stream listing endpoint.
    pub api_token: Option<String>,

    /// Show a notification when a playlist refresh reports failure.
    pub notify_refresh_failures: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            mode: RunMode::Production,
            dev_ws_port: crate::domain::page_context::DEFAULT_DEV_PORT,
            backoff: BackoffPolicy::default(),
            max_attempts: None,
            connect_timeout: Duration::from_secs(10),
            frame_queue_capacity: 1024,
            event_bus_capacity: 1024,
            streams_api_url: None,
            api_token: None,
            notify_refresh_failures: false,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an unknown `RECONNECT_STRATEGY`
    /// and [`ClientError::InvalidAddress`] for an unusable `PAGE_URL`.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let page_url = lookup("PAGE_URL").unwrap_or(defaults.page_url);
        // Validate early so a typo fails at startup, not at first connect.
        PageContext::from_page_url(&page_url)?;

        let mode = RunMode::from_flag(lookup("ENV_MODE").as_deref());
        let dev_ws_port = parse_env(&lookup, "DEV_WS_PORT", defaults.dev_ws_port);

        let strategy = lookup("RECONNECT_STRATEGY").unwrap_or_else(|| "exponential".to_string());
        let delay = Duration::from_millis(parse_env(&lookup, "RECONNECT_DELAY_MS", 3000));
        let step = lookup("RECONNECT_STEP_MS")
            .and_then(|v| v.parse().ok())
            .map_or(delay, Duration::from_millis);
        let max = Duration::from_millis(parse_env(&lookup, "RECONNECT_MAX_DELAY_MS", 30_000));
        let backoff = BackoffPolicy::from_parts(&strategy, delay, step, max).ok_or_else(|| {
            ClientError::Config(format!("unknown RECONNECT_STRATEGY `{strategy}`"))
        })?;

        let max_attempts = match parse_env::<u32, _>(&lookup, "RECONNECT_MAX_ATTEMPTS", 0) {
            0 => None,
            n => Some(n),
        };

        let connect_timeout = Duration::from_secs(parse_env(&lookup, "CONNECT_TIMEOUT_SECS", 10));
        let frame_queue_capacity =
            parse_env(&lookup, "FRAME_QUEUE_CAPACITY", defaults.frame_queue_capacity).max(1);
        let event_bus_capacity =
            parse_env(&lookup, "EVENT_BUS_CAPACITY", defaults.event_bus_capacity).max(1);

        let streams_api_url = lookup("STREAMS_API_URL").filter(|v| !v.is_empty());
        let api_token = lookup("API_TOKEN").filter(|v| !v.is_empty());
        let notify_refresh_failures = parse_env_bool(&lookup, "NOTIFY_REFRESH_FAILURES", false);

        Ok(Self {
            page_url,
            mode,
            dev_ws_port,
            backoff,
            max_attempts,
            connect_timeout,
            frame_queue_capacity,
            event_bus_capacity,
            streams_api_url,
            api_token,
            notify_refresh_failures,
        })
    }

    /// Returns the page context the connection target is derived from.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] if `page_url` is unusable.
    pub fn page_context(&self) -> Result<PageContext, ClientError> {
        Ok(PageContext::from_page_url(&self.page_url)?
            .with_mode(self.mode)
            .with_dev_port(self.dev_ws_port))
    }

    /// Returns the stream listing endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] if the endpoint has to be
    /// derived from an unusable `page_url`.
    pub fn streams_url(&self) -> Result<String, ClientError> {
        if let Some(url) = &self.streams_api_url {
            return Ok(url.clone());
        }
        let origin = PageContext::from_page_url(&self.page_url)?.http_origin();
        Ok(format!("{origin}{STREAMS_API_PATH}"))
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses a variable as a boolean. Accepts `"true"`, `"1"`, `"false"`,
/// `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ClientConfig, ClientError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let Ok(config) = load(&[]) else {
            panic!("defaults must load");
        };
        assert_eq!(config.page_url, DEFAULT_PAGE_URL);
        assert_eq!(config.mode, RunMode::Production);
        assert_eq!(config.backoff, BackoffPolicy::default());
        assert!(config.max_attempts.is_none());
        assert!(!config.notify_refresh_failures);

        let Ok(page) = config.page_context() else {
            panic!("default page must parse");
        };
        assert_eq!(page.ws_url(), "ws://localhost:9191/ws/");
        assert_eq!(
            config.streams_url().ok().as_deref(),
            Some("http://localhost:9191/api/channels/streams/")
        );
    }

    #[test]
    fn development_mode_targets_dev_port() {
        let Ok(config) = load(&[
            ("PAGE_URL", "https://tv.example.com/"),
            ("ENV_MODE", "dev"),
            ("DEV_WS_PORT", "9000"),
        ]) else {
            panic!("config must load");
        };
        let Ok(page) = config.page_context() else {
            panic!("page must parse");
        };
        assert_eq!(page.ws_url(), "wss://tv.example.com:9000/ws/");
    }

    #[test]
    fn reconnect_settings_are_parsed() {
        let Ok(config) = load(&[
            ("RECONNECT_STRATEGY", "linear"),
            ("RECONNECT_DELAY_MS", "500"),
            ("RECONNECT_STEP_MS", "250"),
            ("RECONNECT_MAX_DELAY_MS", "2000"),
            ("RECONNECT_MAX_ATTEMPTS", "5"),
        ]) else {
            panic!("config must load");
        };
        assert_eq!(
            config.backoff,
            BackoffPolicy::Linear {
                initial: Duration::from_millis(500),
                step: Duration::from_millis(250),
                max: Duration::from_millis(2000),
            }
        );
        assert_eq!(config.max_attempts, Some(5));
    }

    #[test]
    fn zero_max_attempts_means_unlimited() {
        let Ok(config) = load(&[("RECONNECT_MAX_ATTEMPTS", "0")]) else {
            panic!("config must load");
        };
        assert!(config.max_attempts.is_none());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = load(&[("RECONNECT_STRATEGY", "random")]);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn bad_page_url_is_rejected() {
        let result = load(&[("PAGE_URL", "ftp://files.example.com/")]);
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let Ok(config) = load(&[("DEV_WS_PORT", "not-a-port"), ("FRAME_QUEUE_CAPACITY", "0")])
        else {
            panic!("config must load");
        };
        assert_eq!(config.dev_ws_port, 8001);
        assert_eq!(config.frame_queue_capacity, 1);
    }

    #[test]
    fn explicit_streams_url_and_flags() {
        let Ok(config) = load(&[
            ("STREAMS_API_URL", "http://api.local/streams"),
            ("API_TOKEN", "secret"),
            ("NOTIFY_REFRESH_FAILURES", "TRUE"),
        ]) else {
            panic!("config must load");
        };
        assert_eq!(
            config.streams_url().ok().as_deref(),
            Some("http://api.local/streams")
        );
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert!(config.notify_refresh_failures);
    }
}
