//! # folio-server
//!
//! Static site and notes API server.
//!
//! The server exposes a small JSON API over a flat data directory managed by
//! [`folio_store`], and serves one or more static roots for every path the API
//! does not claim. An optional shared secret guards the API.
//!
//! ## Example
//!
//! ```rust,no_run
//! use folio_server::{FolioServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), folio_server::ApiError> {
//!     let config = ServerConfig::default()
//!         .with_data_dir("data")
//!         .with_static_root("public");
//!
//!     let server = FolioServer::new(config)?;
//!     server.serve().await
//! }
//! ```
//!
//! ## Configuration
//!
//! Every [`Args`] flag can also come from the environment: `PORT`,
//! `FOLIO_HOST`, `FOLIO_FALLBACK_PORT`, `FOLIO_DATA_DIR`, `FOLIO_API_KEY`,
//! `CORS_ORIGIN`, `FOLIO_STATIC_ROOTS` and `FOLIO_REQUEST_LOGGING`.
//!
//! The data directory and API key were previously read from `SINJA_DATA_DIR`
//! and `SINJA_API_KEY`. Those names are no longer recognised; deployments must
//! rename them to `FOLIO_DATA_DIR` and `FOLIO_API_KEY`, otherwise the server
//! starts with the default `data` directory and no API key.
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/health` | GET | Liveness and uptime |
//! | `/api/upload` | POST | Create or overwrite a file (utf8 or base64 content) |
//! | `/api/append` | POST | Append text to a file, optionally with a newline |
//! | `/api/download/{filename}` | GET | Raw file bytes |
//! | `/api/list` | GET | Sorted file names, filtered by pattern and extension |
//! | `/api/status` | GET | Current status document |
//! | `/api/status` | POST | Merge fields into the status document |
//! | `/api/jsonl/plan` | GET | Page metadata for a JSONL file |
//! | `/api/jsonl/read` | GET | Page metadata plus base64 page text |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use cli::Args;
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::FolioServer;
pub use state::AppState;
