//! Text buffer abstraction the engine scans and edits in place.
//!
//! Offsets are UTF-8 byte offsets and lines are zero-based. `\n`, `\r\n` and a
//! lone `\r` all terminate a line. A buffer with N delimiters has N + 1 lines,
//! so text ending in a delimiter has an empty last line.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Line-addressable text owned by the host editor (or by a file on disk).
///
/// Every accessor fails with `Error::MalformedDocumentState` when asked about
/// a line or offset the text does not contain.
pub trait TextBuffer {
    /// Number of lines, always at least one.
    fn line_count(&self) -> usize;

    /// Length of the delimiter ending `line`; 0 for the last line.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` if `line` is out of range.
    fn line_delimiter_length(&self, line: usize) -> Result<usize, Error>;

    /// Length of `line` including its delimiter.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` if `line` is out of range.
    fn line_length(&self, line: usize) -> Result<usize, Error>;

    /// Line containing `offset`. The end-of-text offset belongs to the last line.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` if `offset` is past the end.
    fn line_of_offset(&self, offset: usize) -> Result<usize, Error>;

    /// Offset of the first byte of `line`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` if `line` is out of range.
    fn line_offset(&self, line: usize) -> Result<usize, Error>;

    /// Replace `length` bytes at `offset` with `text`, shifting later offsets.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` if the range is out of bounds or
    /// splits a character.
    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), Error>;

    /// Persist the current contents.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the backing store cannot be written.
    fn save(&mut self) -> Result<(), Error>;

    /// Full current contents.
    fn text(&self) -> &str;

    /// Offset just before the delimiter of `line`, where markers are inserted.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` if `line` is out of range.
    fn line_content_end(&self, line: usize) -> Result<usize, Error> {
        let start = self.line_offset(line)?;
        let length = self.line_length(line)?;
        let delimiter = self.line_delimiter_length(line)?;
        let content = length.checked_sub(delimiter).ok_or_else(|| {
            return malformed(format!("line {line} is shorter than its delimiter"));
        })?;
        return start.checked_add(content).ok_or_else(|| {
            return malformed(format!("line {line} ends past usize::MAX"));
        });
    }
}

/// A buffer persisted to a file on disk.
#[derive(Debug)]
pub struct FileBuffer {
    /// In-memory contents.
    inner: StringBuffer,
    /// File the contents are loaded from and saved to.
    path: PathBuf,
}

impl FileBuffer {
    /// Read `path` into memory.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file does not exist, or `Error::Io`
    /// for other read failures.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let text = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(t) => t,
        };
        return Ok(Self { inner: StringBuffer::new(text), path: path.to_path_buf() });
    }

    /// File backing this buffer.
    pub fn path(&self) -> &Path {
        return &self.path;
    }
}

impl TextBuffer for FileBuffer {
    fn line_count(&self) -> usize {
        return self.inner.line_count();
    }

    fn line_delimiter_length(&self, line: usize) -> Result<usize, Error> {
        return self.inner.line_delimiter_length(line);
    }

    fn line_length(&self, line: usize) -> Result<usize, Error> {
        return self.inner.line_length(line);
    }

    fn line_of_offset(&self, offset: usize) -> Result<usize, Error> {
        return self.inner.line_of_offset(offset);
    }

    fn line_offset(&self, line: usize) -> Result<usize, Error> {
        return self.inner.line_offset(line);
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), Error> {
        return self.inner.replace(offset, length, text);
    }

    fn save(&mut self) -> Result<(), Error> {
        std::fs::write(&self.path, self.inner.text())?;
        tracing::debug!(path = %self.path.display(), "saved buffer");
        return Ok(());
    }

    fn text(&self) -> &str {
        return self.inner.text();
    }
}

/// In-memory buffer with a line-start table rebuilt after each edit.
/// `save` is a no-op.
#[derive(Debug, Clone, Default)]
pub struct StringBuffer {
    /// Offset of the first byte of every line; the first entry is always 0.
    line_starts: Vec<usize>,
    /// Current contents.
    text: String,
}

impl StringBuffer {
    /// Buffer holding `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        return Self { line_starts, text };
    }

    /// Consume the buffer and return its contents.
    pub fn into_string(self) -> String {
        return self.text;
    }

    /// Start of the line after `line`, or the text length for the last line.
    fn next_line_start(&self, line: usize) -> Result<usize, Error> {
        let next = line.checked_add(1).ok_or_else(|| return malformed("line index overflow"))?;
        return Ok(self.line_starts.get(next).copied().unwrap_or(self.text.len()));
    }
}

impl TextBuffer for StringBuffer {
    fn line_count(&self) -> usize {
        return self.line_starts.len();
    }

    fn line_delimiter_length(&self, line: usize) -> Result<usize, Error> {
        let start = self.line_offset(line)?;
        let end = self.next_line_start(line)?;
        let bytes = self.text.as_bytes().get(start..end).unwrap_or_default();
        let delimiter = if bytes.ends_with(b"\r\n") {
            2
        } else if bytes.ends_with(b"\n") || bytes.ends_with(b"\r") {
            1
        } else {
            0
        };
        return Ok(delimiter);
    }

    fn line_length(&self, line: usize) -> Result<usize, Error> {
        let start = self.line_offset(line)?;
        let end = self.next_line_start(line)?;
        return end.checked_sub(start).ok_or_else(|| {
            return malformed(format!("line {line} starts after the next line"));
        });
    }

    fn line_of_offset(&self, offset: usize) -> Result<usize, Error> {
        if offset > self.text.len() {
            return Err(malformed(format!(
                "offset {offset} is past the end of the text ({} bytes)",
                self.text.len()
            )));
        }
        let following = self.line_starts.partition_point(|&start| return start <= offset);
        return Ok(following.saturating_sub(1));
    }

    fn line_offset(&self, line: usize) -> Result<usize, Error> {
        return self.line_starts.get(line).copied().ok_or_else(|| {
            return malformed(format!(
                "line {line} does not exist ({} lines)",
                self.line_starts.len()
            ));
        });
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), Error> {
        let end = offset.checked_add(length).ok_or_else(|| {
            return malformed(format!("range {offset}+{length} overflows"));
        })?;
        if end > self.text.len() {
            return Err(malformed(format!(
                "range {offset}..{end} is past the end of the text ({} bytes)",
                self.text.len()
            )));
        }
        if !self.text.is_char_boundary(offset) || !self.text.is_char_boundary(end) {
            return Err(malformed(format!("range {offset}..{end} splits a character")));
        }
        self.text.replace_range(offset..end, text);
        self.line_starts = compute_line_starts(&self.text);
        return Ok(());
    }

    fn save(&mut self) -> Result<(), Error> {
        return Ok(());
    }

    fn text(&self) -> &str {
        return &self.text;
    }
}

/// Offsets where each line begins. A `\r\n` pair counts as one delimiter.
fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let mut bytes = text.bytes().enumerate().peekable();
    while let Some((idx, byte)) = bytes.next() {
        let is_delimiter = match byte {
            b'\n' => true,
            b'\r' => !matches!(bytes.peek(), Some(&(_, b'\n'))),
            _ => false,
        };
        if is_delimiter {
            starts.push(idx.saturating_add(1));
        }
    }
    return starts;
}

/// Shorthand for `Error::MalformedDocumentState`.
fn malformed(reason: impl Into<String>) -> Error {
    return Error::MalformedDocumentState { reason: reason.into() };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_for_every_delimiter_style() {
        let buffer = StringBuffer::new("a\nb\r\nc\rd");
        assert_eq!(buffer.line_count(), 4, "three delimiters make four lines");
        assert_eq!(buffer.line_offset(1).unwrap(), 2, "line 1 starts after \\n");
        assert_eq!(buffer.line_offset(2).unwrap(), 5, "line 2 starts after \\r\\n");
        assert_eq!(buffer.line_offset(3).unwrap(), 7, "line 3 starts after \\r");
        assert_eq!(buffer.line_delimiter_length(1).unwrap(), 2, "crlf is two bytes");
        assert_eq!(buffer.line_delimiter_length(3).unwrap(), 0, "last line has no delimiter");
    }

    #[test]
    fn trailing_newline_adds_an_empty_last_line() {
        let buffer = StringBuffer::new("one\ntwo\n");
        assert_eq!(buffer.line_count(), 3, "empty line after final newline");
        assert_eq!(buffer.line_length(2).unwrap(), 0, "last line is empty");
        assert_eq!(buffer.line_content_end(1).unwrap(), 7, "content ends before \\n");
    }

    #[test]
    fn line_of_offset_maps_delimiters_to_their_line() {
        let buffer = StringBuffer::new("ab\ncd");
        assert_eq!(buffer.line_of_offset(2).unwrap(), 0, "the \\n belongs to line 0");
        assert_eq!(buffer.line_of_offset(3).unwrap(), 1, "first byte of line 1");
        assert_eq!(buffer.line_of_offset(5).unwrap(), 1, "end of text is on the last line");
        assert!(buffer.line_of_offset(6).is_err(), "past the end is malformed");
    }

    #[test]
    fn replace_shifts_later_lines() {
        let mut buffer = StringBuffer::new("ab\ncd\n");
        buffer.replace(2, 0, "XYZ").unwrap();
        assert_eq!(buffer.text(), "abXYZ\ncd\n", "text inserted before delimiter");
        assert_eq!(buffer.line_offset(1).unwrap(), 6, "line 1 shifted by three bytes");
    }

    #[test]
    fn replace_rejects_out_of_range_and_split_characters() {
        let mut buffer = StringBuffer::new("é");
        assert!(
            matches!(buffer.replace(0, 5, ""), Err(Error::MalformedDocumentState { .. })),
            "range past end is rejected"
        );
        assert!(
            matches!(buffer.replace(1, 0, "x"), Err(Error::MalformedDocumentState { .. })),
            "offset inside a character is rejected"
        );
        assert_eq!(buffer.text(), "é", "failed edits leave the text alone");
    }
}
