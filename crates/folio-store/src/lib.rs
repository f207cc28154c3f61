//! # folio-store
//!
//! Flat-file storage behind the folio notes API.
//!
//! This crate provides:
//!
//! - [`DataStore`] - A single data directory of named files with append,
//!   upload, download, listing and paged reads
//! - [`FileName`] - Sanitized basename, validated before any filesystem access
//! - [`plan`] - The chunk planner that slices records into char-budgeted pages
//! - [`code_ratio`] - Code-versus-prose heuristic reported with every page
//! - [`StatusDocument`] - The merge-then-overwrite `status_log.json` document
//!
//! ## Example
//!
//! ```rust
//! use folio_store::{plan, PageRequest};
//!
//! let records = ["{\"a\":1}", "{\"a\":2}", "{\"a\":3}"];
//! let page = plan(&records, &PageRequest::new(0).with_target_lines(2));
//!
//! assert_eq!(page.meta.lines, 2);
//! assert_eq!(page.meta.next_cursor, 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod error;
pub mod planner;
pub mod status;
pub mod store;

// Re-export main types
pub use classifier::code_ratio;
pub use error::{Result, StoreError};
pub use planner::{
    DEFAULT_MAX_CHARS, DEFAULT_TARGET_LINES, Page, PageMeta, PageRequest, plan, split_records,
};
pub use status::{STATUS_FILE_NAME, StatusDocument, StatusUpdate};
pub use store::{
    DEFAULT_LIST_LIMIT, DataStore, DataStoreConfig, Encoding, FileListing, FileName, ListQuery,
    MAX_LIST_LIMIT,
};
