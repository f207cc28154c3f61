//! Command-line argument parsing with clap.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::config::{ANY_ORIGIN, DEFAULT_FALLBACK_PORT, DEFAULT_PORT, ServerConfig};

/// Folio - static site and notes API server.
#[derive(Parser, Debug, Clone)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Interface to bind.
    #[arg(long, env = "FOLIO_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port tried when the primary port cannot be bound.
    #[arg(long, env = "FOLIO_FALLBACK_PORT", default_value_t = DEFAULT_FALLBACK_PORT)]
    pub fallback_port: u16,

    /// Fail instead of retrying on the fallback port.
    #[arg(long)]
    pub no_fallback: bool,

    /// Directory holding uploaded files and the status document.
    #[arg(short, long, env = "FOLIO_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Shared secret required on every API request.
    #[arg(long, env = "FOLIO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Allowed CORS origin for API responses.
    #[arg(long, env = "CORS_ORIGIN", default_value = ANY_ORIGIN)]
    pub cors_origin: String,

    /// Directory served as static content. Repeat to add fallbacks.
    #[arg(long = "static-root", env = "FOLIO_STATIC_ROOTS", value_delimiter = ',')]
    pub static_roots: Vec<PathBuf>,

    /// Log every request.
    #[arg(long, env = "FOLIO_REQUEST_LOGGING")]
    pub request_logging: bool,
}

impl Args {
    /// Build the server configuration from parsed arguments.
    #[must_use]
    pub fn into_config(self) -> ServerConfig {
        let fallback = (!self.no_fallback).then_some(self.fallback_port);
        let mut config = ServerConfig::new(SocketAddr::new(self.host, self.port))
            .with_fallback_port(fallback)
            .with_data_dir(self.data_dir)
            .with_cors_origin(self.cors_origin)
            .with_request_logging(self.request_logging);
        if let Some(key) = self.api_key.filter(|k| !k.is_empty()) {
            config = config.with_api_key(key);
        }
        for root in self.static_roots {
            config = config.with_static_root(root);
        }
        config
    }
}
