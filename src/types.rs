/// Core domain types for markers, tag positions, and annotated spans.
use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Line-aligned region a review comment covers.
///
/// Starts at the first byte of the line holding the begin marker and ends at
/// the end of the content of the line holding the end marker (the line
/// delimiter is excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnotatedSpan {
    /// Byte offset one past the last covered byte.
    pub end: usize,
    /// Byte offset of the first covered byte.
    pub start: usize,
}

/// A structural defect the repair engine removed from the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corruption {
    /// Key carried by the deleted marker.
    pub key: String,
    /// What made the marker invalid.
    pub kind: CorruptionKind,
    /// Where the marker sat before it was deleted.
    pub span: Span,
}

/// Kinds of invalid marker sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorruptionKind {
    /// A begin marker whose key never gets an end marker.
    DanglingBegin,
    /// A second begin marker for a key that already has one.
    DuplicateBegin,
    /// A second end marker for a key that already has one.
    DuplicateEnd,
    /// An end marker that appears before any begin marker of its key.
    EndWithoutBegin,
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CorruptionKind::DanglingBegin => "begin marker without end marker",
            CorruptionKind::DuplicateBegin => "duplicate begin marker",
            CorruptionKind::DuplicateEnd => "duplicate end marker",
            CorruptionKind::EndWithoutBegin => "end marker without begin marker",
        };
        return f.write_str(label);
    }
}

/// One marker occurrence found by the scanner. Never stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Leading `?` was present.
    pub begin: bool,
    /// Trailing `?` was present.
    pub end: bool,
    /// Trimmed key between the flags.
    pub key: String,
    /// Text range of the whole marker, delimiters included.
    pub span: Span,
}

impl Marker {
    /// Both flags set: the marker annotates its own line only.
    pub const fn is_self_contained(&self) -> bool {
        return self.begin && self.end;
    }
}

/// Zero-based line range of a selection, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSelection {
    /// Last selected line.
    pub end_line: usize,
    /// First selected line.
    pub start_line: usize,
}

impl LineSelection {
    /// Selection spanning `start_line..=end_line`.
    pub const fn new(start_line: usize, end_line: usize) -> Self {
        return Self { end_line, start_line };
    }

    /// Selection covering exactly one line.
    pub const fn single(line: usize) -> Self {
        return Self { end_line: line, start_line: line };
    }

    /// Whether the selection covers a single line.
    pub const fn is_single_line(&self) -> bool {
        return self.start_line == self.end_line;
    }
}

/// Byte range `[offset, offset + length)` inside a buffer.
///
/// Ordered by `offset`, then `length`. Deleting spans in descending order
/// keeps every remaining offset valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Number of bytes.
    pub length: usize,
    /// Byte offset of the first byte.
    pub offset: usize,
}

impl Span {
    /// Span starting at `offset` covering `length` bytes.
    pub const fn new(offset: usize, length: usize) -> Self {
        return Self { length, offset };
    }

    /// Offset one past the last byte.
    pub const fn end(&self) -> usize {
        return self.offset.saturating_add(self.length);
    }
}

impl Ord for Span {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.offset.cmp(&other.offset).then(self.length.cmp(&other.length));
    }
}

impl PartialOrd for Span {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

/// Raw marker positions recorded for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagPositions {
    /// The begin (or self-contained) marker.
    pub begin: Span,
    /// The end marker. Equal to `begin` for a self-contained marker and
    /// absent only while a parse pass is still running.
    pub end: Option<Span>,
}

impl TagPositions {
    /// Whether one marker carries both flags.
    pub fn is_self_contained(&self) -> bool {
        return self.end == Some(self.begin);
    }
}
