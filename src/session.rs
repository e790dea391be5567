//! A parser session bound to one buffer: parse, insert, and remove markers
//! while keeping the position index in sync with the text.

use std::collections::BTreeSet;

use crate::buffer::TextBuffer;
use crate::dialect::Dialect;
use crate::error::Error;
use crate::index::PositionIndex;
use crate::key::validate_marker_text;
use crate::repair::{self, ParseReport};
use crate::scanner::Scanner;
use crate::sink::{AnnotationSink, NullSink};
use crate::types::{AnnotatedSpan, LineSelection, Span, TagPositions};

/// Owns one buffer for the lifetime of an editing session.
///
/// All operations take `&mut self`; callers must not edit the buffer behind
/// the session's back while an operation runs. The index is replaced only
/// after a parse finishes, so a failed parse leaves the previous one in place.
#[derive(Debug)]
pub struct Session<B, S = NullSink> {
    /// The text being annotated.
    buffer: B,
    /// Index published by the last successful parse.
    index: PositionIndex,
    /// Marker grammar for this buffer's dialect.
    scanner: Scanner,
    /// Receives spans after each successful parse.
    sink: S,
    /// Set by `insert`: the buffer has markers the index does not know about.
    stale: bool,
}

impl<B: TextBuffer> Session<B, NullSink> {
    /// Session without an annotation sink.
    pub fn open(buffer: B, dialect: Dialect) -> Self {
        return Session::attach(buffer, dialect, NullSink);
    }
}

impl<B: TextBuffer, S: AnnotationSink> Session<B, S> {
    /// Bind a session to `buffer`. The index starts empty; call `parse` to
    /// populate it.
    pub fn attach(buffer: B, dialect: Dialect, sink: S) -> Self {
        return Self {
            buffer,
            index: PositionIndex::default(),
            scanner: Scanner::new(dialect),
            sink,
            stale: true,
        };
    }

    /// The buffer being annotated.
    pub const fn buffer(&self) -> &B {
        return &self.buffer;
    }

    /// End the session and hand the buffer back. The index is discarded.
    pub fn detach(self) -> B {
        tracing::debug!(keys = self.index.len(), "session detached");
        return self.buffer;
    }

    /// Delete marker spans from the highest offset down, then save and reparse.
    ///
    /// # Errors
    ///
    /// Returns buffer access, save, or parse errors.
    fn delete_spans(&mut self, spans: BTreeSet<Span>) -> Result<(), Error> {
        if spans.is_empty() {
            return Ok(());
        }
        for span in spans.iter().rev() {
            self.buffer.replace(span.offset, span.length, "")?;
        }
        self.buffer.save()?;
        self.parse()?;
        return Ok(());
    }

    /// Marker dialect of this session.
    pub const fn dialect(&self) -> Dialect {
        return self.scanner.dialect();
    }

    /// Index published by the last successful parse.
    pub const fn index(&self) -> &PositionIndex {
        return &self.index;
    }

    /// Insert markers for `key` around `selection` and save the buffer.
    ///
    /// A single-line selection gets one self-contained marker at the end of
    /// the line. A multi-line selection gets an end marker at the end of the
    /// last line, then a begin marker at the end of the first line, so the
    /// first line's offset is still valid when the second insert happens.
    ///
    /// Returns the span the markers cover. The index is stale until the next
    /// `parse`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoActiveSelection` if `selection` is missing, inverted,
    /// or past the last line; `Error::InvalidKey` if `key` cannot be embedded;
    /// `Error::KeyExists` if the index already has `key`. None of these insert
    /// markers, though a stale index is reparsed (and repaired) first. Buffer
    /// access or save failures propagate.
    pub fn insert(&mut self, key: &str, selection: Option<LineSelection>) -> Result<AnnotatedSpan, Error> {
        let Some(selection) = selection else {
            return Err(Error::NoActiveSelection);
        };
        validate_marker_text(key)?;
        if self.stale {
            self.parse()?;
        }
        // Repair may have merged lines, so bounds are checked on the parsed text.
        if selection.start_line > selection.end_line || selection.end_line >= self.buffer.line_count() {
            return Err(Error::NoActiveSelection);
        }
        if self.index.contains(key) {
            return Err(Error::KeyExists { key: key.to_string() });
        }

        let dialect = self.dialect();
        if selection.is_single_line() {
            let at = self.buffer.line_content_end(selection.start_line)?;
            self.buffer.replace(at, 0, &dialect.self_contained_marker(key))?;
        } else {
            let end_at = self.buffer.line_content_end(selection.end_line)?;
            let begin_at = self.buffer.line_content_end(selection.start_line)?;
            self.buffer.replace(end_at, 0, &dialect.end_marker(key))?;
            self.buffer.replace(begin_at, 0, &dialect.begin_marker(key))?;
        }

        let span = AnnotatedSpan {
            end: self.buffer.line_content_end(selection.end_line)?,
            start: self.buffer.line_offset(selection.start_line)?,
        };
        self.stale = true;
        self.buffer.save()?;

        tracing::info!(
            key,
            start_line = selection.start_line,
            end_line = selection.end_line,
            "inserted review markers"
        );
        return Ok(span);
    }

    /// Whether the buffer changed since the index was last rebuilt.
    pub const fn is_stale(&self) -> bool {
        return self.stale;
    }

    /// Rescan the buffer, repair corrupt markers in place, replace the index,
    /// and publish the spans to the sink. Repairs are not saved.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedDocumentState` on buffer access failures; the
    /// previous index stays in place.
    pub fn parse(&mut self) -> Result<ParseReport, Error> {
        let report = repair::parse(&mut self.buffer, &self.scanner)?;
        self.index = report.index.clone();
        self.stale = false;
        self.sink.publish(self.index.spans());
        return Ok(report);
    }

    /// Remove the markers of `key`, save, and reparse. No-op if `key` has no
    /// markers.
    ///
    /// # Errors
    ///
    /// Returns buffer access, save, or parse errors.
    pub fn remove(&mut self, key: &str) -> Result<(), Error> {
        if self.stale {
            self.parse()?;
        }
        let Some(tags) = self.index.tag_positions(key) else {
            return Ok(());
        };

        let spans = spans_of(tags);
        self.delete_spans(spans)?;
        tracing::info!(key, "removed review markers");
        return Ok(());
    }

    /// Remove the markers of every key in the index.
    ///
    /// # Errors
    ///
    /// Returns buffer access, save, or parse errors.
    pub fn remove_all(&mut self) -> Result<usize, Error> {
        if self.stale {
            self.parse()?;
        }
        let keys: Vec<String> = self.index.keys().map(str::to_string).collect();
        self.remove_many(keys.as_slice())?;
        return Ok(keys.len());
    }

    /// Remove the markers of several keys with one save and one reparse.
    /// Absent keys are ignored. The result equals removing the keys one at a
    /// time in any order.
    ///
    /// # Errors
    ///
    /// Returns buffer access, save, or parse errors.
    pub fn remove_many<K: AsRef<str>>(&mut self, keys: &[K]) -> Result<(), Error> {
        if self.stale {
            self.parse()?;
        }
        let spans: BTreeSet<Span> = keys
            .iter()
            .filter_map(|key| return self.index.tag_positions(key.as_ref()))
            .flat_map(spans_of)
            .collect();

        let count = spans.len();
        self.delete_spans(spans)?;
        tracing::info!(keys = keys.len(), markers = count, "removed review markers");
        return Ok(());
    }

    /// Offset an editor should reveal for `key`: the start of its first line.
    pub fn reveal_offset(&self, key: &str) -> Option<usize> {
        return self.index.span_of(key).map(|span| return span.start);
    }

    /// Persist the buffer, e.g. after a parse repaired markers.
    ///
    /// # Errors
    ///
    /// Returns the buffer's save error.
    pub fn save(&mut self) -> Result<(), Error> {
        return self.buffer.save();
    }

    /// The annotation sink.
    pub const fn sink(&self) -> &S {
        return &self.sink;
    }

    /// Annotated region of `key` as of the last parse.
    pub fn span_of(&self, key: &str) -> Option<AnnotatedSpan> {
        return self.index.span_of(key);
    }

    /// Marker positions of `key` as of the last parse.
    pub fn tag_positions(&self, key: &str) -> Option<TagPositions> {
        return self.index.tag_positions(key);
    }
}

/// The distinct marker spans of one key: one for a self-contained marker,
/// two for a pair.
fn spans_of(tags: TagPositions) -> BTreeSet<Span> {
    return std::iter::once(tags.begin).chain(tags.end).collect();
}
