//! Server configuration.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default port, as expected by the hosting panel.
pub const DEFAULT_PORT: u16 = 80;

/// Port tried when the primary port cannot be bound.
pub const DEFAULT_FALLBACK_PORT: u16 = 8080;

/// CORS origin that allows any caller.
pub const ANY_ORIGIN: &str = "*";

/// Configuration for the folio server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Port to retry on when binding `bind_addr` fails.
    pub fallback_port: Option<u16>,
    /// Directory backing the notes API.
    pub data_dir: PathBuf,
    /// Shared secret required on every API request, if set.
    pub api_key: Option<String>,
    /// Value of `Access-Control-Allow-Origin` on API responses.
    pub cors_origin: String,
    /// Directories served as static content, first match wins.
    pub static_roots: Vec<PathBuf>,
    /// Emit a tracing span per request.
    pub request_logging: bool,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("fallback_port", &self.fallback_port)
            .field("data_dir", &self.data_dir)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("cors_origin", &self.cors_origin)
            .field("static_roots", &self.static_roots)
            .field("request_logging", &self.request_logging)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            fallback_port: Some(DEFAULT_FALLBACK_PORT),
            data_dir: PathBuf::from("data"),
            api_key: None,
            cors_origin: ANY_ORIGIN.to_string(),
            static_roots: Vec::new(),
            request_logging: false,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the fallback port, or disable the fallback with `None`.
    #[must_use]
    pub const fn with_fallback_port(mut self, port: Option<u16>) -> Self {
        self.fallback_port = port;
        self
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Require `key` on every API request.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the allowed CORS origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = origin.into();
        self
    }

    /// Add a static root. Roots are tried in the order they were added.
    #[must_use]
    pub fn with_static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_roots.push(root.into());
        self
    }

    /// Enable per-request tracing.
    #[must_use]
    pub const fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// The address to retry on, if a distinct fallback port is configured.
    #[must_use]
    pub fn fallback_addr(&self) -> Option<SocketAddr> {
        self.fallback_port
            .filter(|port| *port != self.bind_addr.port())
            .map(|port| SocketAddr::new(self.bind_addr.ip(), port))
    }
}
