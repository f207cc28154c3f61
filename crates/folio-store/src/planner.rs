//! Chunk planner for line-delimited files.
//!
//! A page is the longest run of records starting at a cursor that fits both
//! a character budget and a target line count. Every call on a non-exhausted
//! cursor yields at least one record, so callers feeding `next_cursor` back
//! in always make forward progress:
//!
//! - a record that alone exceeds the budget is returned cut to `max_chars`
//!   characters and flagged `oversize`
//! - `next_cursor == end + 1` on every page, empty pages included

use serde::{Deserialize, Serialize};

use crate::classifier::code_ratio;

/// Default character budget per page.
pub const DEFAULT_MAX_CHARS: usize = 12_000;

/// Default number of records per page.
pub const DEFAULT_TARGET_LINES: usize = 300;

/// Paging parameters for one planner call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Record offset to start from.
    pub cursor: usize,
    /// Maximum number of records on the page.
    pub target_lines: usize,
    /// Maximum number of characters on the page, one per line terminator included.
    pub max_chars: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            cursor: 0,
            target_lines: DEFAULT_TARGET_LINES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl PageRequest {
    /// Creates a request starting at `cursor` with default budgets.
    #[must_use]
    pub fn new(cursor: usize) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }

    /// Sets the target line count.
    #[must_use]
    pub const fn with_target_lines(mut self, target_lines: usize) -> Self {
        self.target_lines = target_lines;
        self
    }

    /// Sets the character budget.
    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// Describes one page of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// First record index on the page.
    pub start: usize,
    /// Last record index on the page, `start - 1` when the page is empty.
    pub end: i64,
    /// Number of records on the page.
    pub lines: usize,
    /// Characters on the page, counting one per line terminator.
    pub chars: usize,
    /// Cursor for the following page.
    pub next_cursor: usize,
    /// The page stopped early because the character budget ran out.
    pub truncated: bool,
    /// The first record alone exceeded the budget and was cut short.
    pub oversize: bool,
    /// Code-likeness of the page text, see [`code_ratio`].
    pub code_ratio: f64,
}

/// A planned page: the selected records and their metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Selected records, the oversize one already cut to the budget.
    pub records: Vec<String>,
    /// Page metadata.
    pub meta: PageMeta,
}

impl Page {
    fn empty(start: usize) -> Self {
        Self {
            records: Vec::new(),
            meta: PageMeta {
                start,
                end: i64::try_from(start).map_or(i64::MAX, |s| s - 1),
                lines: 0,
                chars: 0,
                next_cursor: start,
                truncated: false,
                oversize: false,
                code_ratio: 0.0,
            },
        }
    }

    /// Returns true if the page holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Joins the records with `\n`, without a trailing terminator.
    #[must_use]
    pub fn text(&self) -> String {
        self.records.join("\n")
    }
}

/// Splits file content into records.
///
/// Both `\n` and `\r\n` terminate a record. A terminator at the very end of
/// the content does not start another record, so empty content has none.
pub fn split_records(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Plans the page of `records` described by `request`.
pub fn plan<S: AsRef<str>>(records: &[S], request: &PageRequest) -> Page {
    let start = request.cursor;
    if start >= records.len() {
        return Page::empty(start);
    }

    let window_end = start
        .saturating_add(request.target_lines.max(1) - 1)
        .min(records.len() - 1);

    let mut selected: Vec<String> = Vec::new();
    let mut chars = 0usize;
    let mut truncated = false;
    let mut oversize = false;

    for record in &records[start..=window_end] {
        let record = record.as_ref();
        let cost = record.chars().count() + 1;

        if chars + cost <= request.max_chars {
            chars += cost;
            selected.push(record.to_owned());
            continue;
        }

        if selected.is_empty() {
            selected.push(record.chars().take(request.max_chars).collect());
            chars = request.max_chars;
            oversize = true;
        }
        truncated = true;
        break;
    }

    let lines = selected.len();
    let end = start + lines - 1;
    let code_ratio = code_ratio(&selected.join("\n"));

    Page {
        records: selected,
        meta: PageMeta {
            start,
            end: i64::try_from(end).unwrap_or(i64::MAX),
            lines,
            chars,
            next_cursor: end + 1,
            truncated,
            oversize,
            code_ratio,
        },
    }
}
