/// Marker dialect resolution by file extension, plus the marker grammar.
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;

/// Matches block-comment markers: `/*?KEY*/`, `/*KEY?*/`, `/*?KEY?*/`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, compile-time invariant")]
static BLOCK_COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"/\*\s*(\??)\s*([^?\r\n*]*?)\s*(\??)\s*\*/").expect("valid regex");
});

/// Matches markup-comment markers: `<!--?KEY-->`, `<!--KEY?-->`, `<!--?KEY?-->`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, compile-time invariant")]
static MARKUP_COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"<!--\s*(\??)\s*([^?\r\n*]*?)\s*(\??)\s*-->").expect("valid regex");
});

/// Comment syntax markers are disguised as. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// `/* ... */` comments (Java, C, Rust, CSS, ...).
    BlockComment,
    /// `<!-- ... -->` comments (XML, HTML, ...).
    MarkupComment,
}

impl Dialect {
    /// Marker opening a multi-line annotation: `/*?KEY*/`.
    pub fn begin_marker(self, key: &str) -> String {
        let (open, close) = self.delimiters();
        return format!("{open}?{key}{close}");
    }

    /// Opening and closing comment delimiters.
    pub const fn delimiters(self) -> (&'static str, &'static str) {
        return match self {
            Dialect::BlockComment => ("/*", "*/"),
            Dialect::MarkupComment => ("<!--", "-->"),
        };
    }

    /// Marker closing a multi-line annotation: `/*KEY?*/`.
    pub fn end_marker(self, key: &str) -> String {
        let (open, close) = self.delimiters();
        return format!("{open}{key}?{close}");
    }

    /// Grammar recognizing this dialect's markers. Capture groups are the
    /// begin flag, the untrimmed key, and the end flag.
    pub fn pattern(self) -> &'static Regex {
        return match self {
            Dialect::BlockComment => LazyLock::force(&BLOCK_COMMENT_PATTERN),
            Dialect::MarkupComment => LazyLock::force(&MARKUP_COMMENT_PATTERN),
        };
    }

    /// Marker annotating a single line: `/*?KEY?*/`.
    pub fn self_contained_marker(self, key: &str) -> String {
        let (open, close) = self.delimiters();
        return format!("{open}?{key}?{close}");
    }
}

/// Map a file extension to its marker dialect using the configured file types.
///
/// # Errors
///
/// Returns `Error::UnsupportedFileType` for unknown or missing extensions.
pub fn dialect_for_path(path: &Path, config: &Config) -> Result<Dialect, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return config.dialect_for_extension(ext).ok_or_else(|| {
        return Error::UnsupportedFileType { ext: ext.to_string() };
    });
}
