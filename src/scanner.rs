use regex::Regex;

use crate::dialect::Dialect;
use crate::types::{Marker, Span};

/// Finds markers of one dialect in left-to-right order.
/// Holds nothing but the dialect's pattern.
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    /// Dialect the pattern belongs to.
    dialect: Dialect,
    /// Compiled marker grammar.
    pattern: &'static Regex,
}

impl Scanner {
    /// Dialect this scanner recognizes.
    pub const fn dialect(&self) -> Dialect {
        return self.dialect;
    }

    /// First marker starting at or after `from`.
    ///
    /// Comments that fit the grammar but carry neither flag are ordinary
    /// source comments and are skipped. Returns `None` when no marker remains
    /// or `from` is not a character position inside `text`.
    pub fn find_next(&self, text: &str, from: usize) -> Option<Marker> {
        if !text.is_char_boundary(from) {
            return None;
        }

        let mut cursor = from;
        while let Some(caps) = self.pattern.captures_at(text, cursor) {
            let whole = caps.get(0)?;
            let begin = caps.get(1).is_some_and(|m| return !m.as_str().is_empty());
            let end = caps.get(3).is_some_and(|m| return !m.as_str().is_empty());

            if begin || end {
                let key = caps.get(2).map_or("", |m| return m.as_str()).trim().to_string();
                return Some(Marker {
                    begin,
                    end,
                    key,
                    span: Span::new(whole.start(), whole.len()),
                });
            }
            cursor = whole.end();
        }

        return None;
    }

    /// Scanner for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        return Self { dialect, pattern: dialect.pattern() };
    }
}
