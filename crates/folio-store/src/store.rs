//! File-backed data directory.
//!
//! This module provides:
//! - [`DataStore`] - One flat directory of named files plus the status document
//! - [`FileName`] - A validated basename; every operation resolves through it
//! - Paged reads over line-delimited files via the [`planner`](crate::planner)

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::planner::{Page, PageMeta, PageRequest, plan, split_records};
use crate::status::{STATUS_FILE_NAME, StatusDocument, StatusUpdate};

/// Default number of names returned by [`DataStore::list`].
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Upper bound on the number of names returned by [`DataStore::list`].
pub const MAX_LIST_LIMIT: usize = 5000;

/// A file name reduced to its final path component.
///
/// Directory parts are stripped (both `/` and `\` separate), surrounding
/// whitespace is trimmed, and names that are empty or a bare `.`/`..` are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    /// Validates `raw` and keeps only its basename.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidFilename`] when nothing usable remains.
    pub fn parse(raw: &str) -> Result<Self> {
        let base = raw.trim().rsplit(['/', '\\']).next().unwrap_or_default();
        if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
            return Err(StoreError::InvalidFilename(raw.to_string()));
        }
        Ok(Self(base.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Encoding of uploaded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Content is written as UTF-8 text.
    #[default]
    Utf8,
    /// Content is base64 and decoded before writing.
    Base64,
}

impl Encoding {
    /// Decodes `content` into the bytes to be written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] for malformed base64.
    pub fn decode(self, content: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(content.as_bytes().to_vec()),
            Self::Base64 => STANDARD
                .decode(content.trim())
                .map_err(|e| StoreError::InvalidPayload(e.to_string())),
        }
    }
}

impl FromStr for Encoding {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "base64" => Ok(Self::Base64),
            _ => Err(StoreError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Filters for [`DataStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring the name must contain.
    pub pattern: Option<String>,
    /// Case-insensitive suffix the name must end with.
    pub ext: Option<String>,
    /// Maximum number of names, capped at [`MAX_LIST_LIMIT`].
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Sets the substring filter.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the suffix filter.
    #[must_use]
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }

    /// Sets the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let pattern_ok = self
            .pattern
            .as_deref()
            .is_none_or(|p| name.contains(&p.to_lowercase()));
        let ext_ok = self
            .ext
            .as_deref()
            .is_none_or(|e| name.ends_with(&e.to_lowercase()));
        pattern_ok && ext_ok
    }
}

/// Result of [`DataStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    /// The data directory that was listed.
    pub dir: String,
    /// Number of names returned.
    pub count: usize,
    /// Matching file names, sorted.
    pub files: Vec<String>,
}

/// Configuration for the data store.
#[derive(Debug, Clone)]
pub struct DataStoreConfig {
    /// Directory holding every stored file.
    pub base_dir: PathBuf,
    /// Name of the status document inside `base_dir`.
    pub status_file: String,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            status_file: STATUS_FILE_NAME.to_string(),
        }
    }
}

impl DataStoreConfig {
    /// Creates a new config with the given base directory.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Sets the status document file name.
    #[must_use]
    pub fn with_status_file(mut self, name: impl Into<String>) -> Self {
        self.status_file = name.into();
        self
    }
}

/// Flat directory of named files behind the notes API.
///
/// Appends and uploads are not locked against each other; a single writer
/// per file is assumed. Status writes are serialized within the process.
pub struct DataStore {
    config: DataStoreConfig,
    status_lock: Mutex<()>,
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("base_dir", &self.config.base_dir)
            .finish_non_exhaustive()
    }
}

impl DataStore {
    /// Opens the store, creating the base directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be created.
    pub fn open(config: DataStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.base_dir)?;
        debug!(base_dir = %config.base_dir.display(), "opened data store");
        Ok(Self {
            config,
            status_lock: Mutex::new(()),
        })
    }

    /// Opens a store at `base_dir` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be created.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(DataStoreConfig::new(base_dir))
    }

    /// Returns the data directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DataStoreConfig {
        &self.config
    }

    /// Appends `content` to `filename`, creating the file if absent.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name or a failed write.
    pub fn append(&self, filename: &str, content: &str, newline: bool) -> Result<FileName> {
        let (name, path) = self.resolve(filename)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if newline {
            file.write_all(format!("{content}\n").as_bytes())?;
        } else {
            file.write_all(content.as_bytes())?;
        }

        debug!(file = %name, bytes = content.len(), newline, "appended");
        Ok(name)
    }

    /// Replaces `filename` with the decoded `content`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name, undecodable content, or a
    /// failed write.
    pub fn upload(&self, filename: &str, content: &str, encoding: Encoding) -> Result<FileName> {
        let (name, path) = self.resolve(filename)?;
        let bytes = encoding.decode(content)?;
        fs::write(&path, &bytes)?;

        debug!(file = %name, bytes = bytes.len(), ?encoding, "uploaded");
        Ok(name)
    }

    /// Reads the raw bytes of `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the file does not exist.
    pub fn download(&self, filename: &str) -> Result<(FileName, Vec<u8>)> {
        let (name, path) = self.resolve(filename)?;
        let bytes = read_existing(&name, &path)?;
        Ok((name, bytes))
    }

    /// Lists file names in the data directory matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn list(&self, query: &ListQuery) -> Result<FileListing> {
        let mut files: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.config.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if query.matches(&name) {
                files.push(name);
            }
        }
        files.sort();
        files.truncate(query.effective_limit());

        Ok(FileListing {
            dir: self.config.base_dir.display().to_string(),
            count: files.len(),
            files,
        })
    }

    /// Plans a page of `filename` without returning its records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the file does not exist.
    pub fn plan_page(&self, filename: &str, request: &PageRequest) -> Result<(FileName, PageMeta)> {
        let (name, page) = self.read_page(filename, request)?;
        Ok((name, page.meta))
    }

    /// Reads a page of records from `filename`.
    ///
    /// Bytes that are not valid UTF-8 are replaced before splitting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the file does not exist.
    pub fn read_page(&self, filename: &str, request: &PageRequest) -> Result<(FileName, Page)> {
        let (name, path) = self.resolve(filename)?;
        let bytes = read_existing(&name, &path)?;
        let content = String::from_utf8_lossy(&bytes);
        let page = plan(&split_records(&content), request);

        debug!(
            file = %name,
            cursor = request.cursor,
            lines = page.meta.lines,
            chars = page.meta.chars,
            truncated = page.meta.truncated,
            "planned page"
        );
        Ok((name, page))
    }

    /// Reads the status document, or a null-filled one if none was written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StatusParse`] if the stored document is corrupt.
    pub fn status(&self) -> Result<StatusDocument> {
        self.load_status()
    }

    /// Merges `update` into the status document and writes it back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StatusParse`] if the stored document is corrupt,
    /// or an I/O error if it cannot be written.
    pub fn set_status(&self, update: StatusUpdate) -> Result<StatusDocument> {
        let _guard = self.status_lock.lock();

        let next = self.load_status()?.merged(update, Utc::now());
        let json = serde_json::to_string_pretty(&next)?;
        fs::write(self.status_path(), json)?;

        debug!(phase = ?next.phase, part = ?next.part, "status written");
        Ok(next)
    }

    // ========== Internal Methods ==========

    fn resolve(&self, filename: &str) -> Result<(FileName, PathBuf)> {
        let name = FileName::parse(filename)?;
        let path = self.config.base_dir.join(name.as_str());
        Ok((name, path))
    }

    fn status_path(&self) -> PathBuf {
        self.config.base_dir.join(&self.config.status_file)
    }

    fn load_status(&self) -> Result<StatusDocument> {
        match fs::read(self.status_path()) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(StoreError::StatusParse),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StatusDocument::default()),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_existing(name: &FileName, path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StoreError::NotFound(name.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
