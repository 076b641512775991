//! Connection target derivation from the hosting page.
//!
//! The dashboard is served from some page URL; the event channel lives at
//! `/ws/` on the same host. The mapping is:
//!
//! | Page scheme | Mode        | Target                              |
//! |-------------|-------------|-------------------------------------|
//! | `http`      | production  | `ws://{host}/ws/`                   |
//! | `https`     | production  | `wss://{host}/ws/`                  |
//! | `http`      | development | `ws://{hostname}:{dev_port}/ws/`    |
//! | `https`     | development | `wss://{hostname}:{dev_port}/ws/`   |
//!
//! `host` includes a non-default port, `hostname` never does.

use url::Url;

use crate::error::ClientError;

/// Path of the event channel on the application host.
pub const WS_PATH: &str = "/ws/";

/// Port the development event server listens on.
pub const DEFAULT_DEV_PORT: u16 = 8001;

/// Deployment mode that decides whether the port is overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Event channel served by the same origin as the page.
    #[default]
    Production,
    /// Event channel served by a separate dev server on a fixed port.
    Development,
}

impl RunMode {
    /// Parses the `ENV_MODE` flag. Only `"dev"` selects development.
    #[must_use]
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(v) if v.eq_ignore_ascii_case("dev") => Self::Development,
            _ => Self::Production,
        }
    }
}

/// Ambient page information the target address is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    host: String,
    hostname: String,
    secure: bool,
    mode: RunMode,
    dev_port: u16,
}

impl PageContext {
    /// Builds a context from explicit parts.
    #[must_use]
    pub fn new(host: impl Into<String>, hostname: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            hostname: hostname.into(),
            secure,
            mode: RunMode::Production,
            dev_port: DEFAULT_DEV_PORT,
        }
    }

    /// Builds a context from the page URL, e.g. `https://tv.example.com:9191/channels`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] if the URL does not parse,
    /// is not `http`/`https`, or has no host.
    pub fn from_page_url(page_url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(page_url)
            .map_err(|e| ClientError::InvalidAddress(format!("{page_url}: {e}")))?;

        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(ClientError::InvalidAddress(format!(
                    "unsupported page scheme `{other}`"
                )));
            }
        };

        let hostname = url
            .host_str()
            .ok_or_else(|| ClientError::InvalidAddress(format!("{page_url}: missing host")))?
            .to_string();

        // `Url::port` is `None` for the scheme's default port, like a
        // browser's `location.host`.
        let host = match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.clone(),
        };

        Ok(Self::new(host, hostname, secure))
    }

    /// Sets the run mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the port used in development mode.
    #[must_use]
    pub fn with_dev_port(mut self, port: u16) -> Self {
        self.dev_port = port;
        self
    }

    /// Returns `true` if the page was loaded over a secure transport.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Returns the run mode.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Returns the connection target for the event channel.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        match self.mode {
            RunMode::Production => format!("{scheme}://{}{WS_PATH}", self.host),
            RunMode::Development => {
                format!("{scheme}://{}:{}{WS_PATH}", self.hostname, self.dev_port)
            }
        }
    }

    /// Returns the HTTP origin of the page, e.g. `https://tv.example.com:9191`.
    #[must_use]
    pub fn http_origin(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.host)
    }
}
