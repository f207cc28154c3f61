//! Code-versus-prose heuristic for page metadata.
//!
//! The ratio is descriptive only; nothing in the store branches on it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens that usually only show up in source code or markup.
static CODE_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`{1,3}|\{|\}|;|class\s|function\s|=>|<\w+|</|\bconst\b|\blet\b|\bvar\b")
        .unwrap_or_else(|_| unreachable!())
});

/// Runs of three or more letters, German umlauts included.
static WORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zÄÖÜäöüß]{3,}").unwrap_or_else(|_| unreachable!()));

/// Estimates how code-like `text` is, as a ratio in `[0, 1]`.
///
/// Returns `codeHits / (codeHits + textHits)`. Text without any word hits
/// scores `1.0` when it has code hits and `0.0` otherwise.
pub fn code_ratio(text: &str) -> f64 {
    let code_hits = CODE_TOKEN_REGEX.find_iter(text).count();
    let text_hits = WORD_REGEX.find_iter(text).count();

    if text_hits == 0 {
        return if code_hits > 0 { 1.0 } else { 0.0 };
    }
    code_hits as f64 / (code_hits + text_hits) as f64
}
