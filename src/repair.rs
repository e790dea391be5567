//! Full parse pass with self-healing.
//!
//! Scans a buffer for markers, records valid begin/end pairs, and deletes
//! markers that break the structure: a second begin or end for the same key,
//! an end before any begin, and a begin that never gets an end. Every
//! deletion removes marker text, so repeating the pass reaches a fixed point
//! with no deletions left.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::buffer::TextBuffer;
use crate::error::Error;
use crate::index::PositionIndex;
use crate::scanner::Scanner;
use crate::types::{AnnotatedSpan, Corruption, CorruptionKind, Marker, Span, TagPositions};

/// Entry for one key while a pass is running.
struct PendingEntry {
    /// Begin (or self-contained) marker.
    begin: Span,
    /// End marker, once seen.
    end: Option<Span>,
    /// Start of the line holding `begin`.
    start: usize,
    /// End of the content of the line holding `end`, once seen.
    stop: Option<usize>,
}

/// Result of a completed parse.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseReport {
    /// Every marker the repair engine deleted, in deletion order.
    pub corruptions: Vec<Corruption>,
    /// The consistent index of the repaired buffer.
    pub index: PositionIndex,
    /// Number of scan passes, at least one.
    pub passes: usize,
}

impl ParseReport {
    /// Whether the parse had to change the buffer.
    pub fn repaired(&self) -> bool {
        return !self.corruptions.is_empty();
    }
}

/// Outcome of classifying one marker against the pass state.
enum Verdict {
    /// Marker was recorded.
    Accepted,
    /// Marker breaks the structure and must be deleted.
    Corrupt(CorruptionKind),
}

/// Decide whether `marker` is valid given what the pass has recorded so far.
/// Records it when it is.
///
/// # Errors
///
/// Returns `Error::MalformedDocumentState` if the marker's line cannot be
/// addressed in `buffer`.
fn classify_and_record<B: TextBuffer + ?Sized>(
    buffer: &B,
    entries: &mut BTreeMap<String, PendingEntry>,
    marker: &Marker,
) -> Result<Verdict, Error> {
    if marker.begin {
        if entries.contains_key(&marker.key) {
            return Ok(Verdict::Corrupt(CorruptionKind::DuplicateBegin));
        }
        let line = buffer.line_of_offset(marker.span.offset)?;
        let start = buffer.line_offset(line)?;
        entries.insert(marker.key.clone(), PendingEntry {
            begin: marker.span,
            end: None,
            start,
            stop: None,
        });
    }

    if marker.end {
        let Some(entry) = entries.get_mut(&marker.key) else {
            return Ok(Verdict::Corrupt(CorruptionKind::EndWithoutBegin));
        };
        if entry.end.is_some() {
            return Ok(Verdict::Corrupt(CorruptionKind::DuplicateEnd));
        }
        let line = buffer.line_of_offset(marker.span.offset)?;
        entry.end = Some(marker.span);
        entry.stop = Some(buffer.line_content_end(line)?);
    }

    return Ok(Verdict::Accepted);
}

/// Remove a marker's text from the buffer.
///
/// # Errors
///
/// Returns `Error::MalformedDocumentState` if the span no longer fits the buffer.
fn delete_marker<B: TextBuffer + ?Sized>(buffer: &mut B, span: Span) -> Result<(), Error> {
    return buffer.replace(span.offset, span.length, "");
}

/// Turn a finished pass into an index. Every entry has an end by now.
fn finish_index(entries: BTreeMap<String, PendingEntry>) -> PositionIndex {
    let mut index = PositionIndex::default();
    for (key, entry) in entries {
        let (Some(end), Some(stop)) = (entry.end, entry.stop) else {
            continue;
        };
        let span = AnnotatedSpan { end: stop.max(entry.start), start: entry.start };
        index.insert(key, span, TagPositions { begin: entry.begin, end: Some(end) });
    }
    return index;
}

/// Parse `buffer`, repairing structural corruption in place, until a pass
/// deletes nothing.
///
/// Corruption is logged as a warning and listed in the report; it never
/// fails the parse. The buffer is not saved.
///
/// # Errors
///
/// Returns `Error::MalformedDocumentState` if the buffer rejects an offset the
/// scan derived from its own text.
pub fn parse<B: TextBuffer + ?Sized>(buffer: &mut B, scanner: &Scanner) -> Result<ParseReport, Error> {
    let mut corruptions = Vec::new();
    let mut passes = 0_usize;

    loop {
        passes = passes.saturating_add(1);
        let repaired_before = corruptions.len();
        let entries = scan_pass(buffer, scanner, &mut corruptions)?;

        let mut dangling: Vec<(Span, String)> = entries
            .iter()
            .filter(|(_, entry)| return entry.end.is_none())
            .map(|(key, entry)| return (entry.begin, key.clone()))
            .collect();

        if dangling.is_empty() {
            // Deleting a marker joins the text around it; only a pass that
            // deleted nothing proves the buffer is stable.
            if corruptions.len() == repaired_before {
                tracing::debug!(passes, keys = entries.len(), "parse reached a fixed point");
                return Ok(ParseReport { corruptions, index: finish_index(entries), passes });
            }
            continue;
        }

        // Highest offset first so earlier spans stay valid.
        dangling.sort_unstable_by(|a, b| return b.0.offset.cmp(&a.0.offset));
        for (span, key) in dangling {
            delete_marker(buffer, span)?;
            report(&mut corruptions, key, CorruptionKind::DanglingBegin, span);
        }
        tracing::debug!(passes, "dangling begin markers removed, rescanning");
    }
}

/// Log one repaired corruption and add it to the report.
fn report(corruptions: &mut Vec<Corruption>, key: String, kind: CorruptionKind, span: Span) {
    tracing::warn!(key = %key, kind = %kind, offset = span.offset, "removed corrupt review marker");
    corruptions.push(Corruption { key, kind, span });
}

/// One left-to-right scan. Deletes duplicate and orphaned markers as it goes
/// and resumes at the deletion point, since later offsets have shifted.
///
/// # Errors
///
/// Returns `Error::MalformedDocumentState` on buffer access failures.
fn scan_pass<B: TextBuffer + ?Sized>(
    buffer: &mut B,
    scanner: &Scanner,
    corruptions: &mut Vec<Corruption>,
) -> Result<BTreeMap<String, PendingEntry>, Error> {
    let mut entries: BTreeMap<String, PendingEntry> = BTreeMap::new();
    let mut cursor = 0_usize;

    while let Some(marker) = scanner.find_next(buffer.text(), cursor) {
        match classify_and_record(buffer, &mut entries, &marker)? {
            Verdict::Accepted => cursor = marker.span.end(),
            Verdict::Corrupt(kind) => {
                delete_marker(buffer, marker.span)?;
                cursor = marker.span.offset;
                report(corruptions, marker.key, kind, marker.span);
            },
        }
    }

    return Ok(entries);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "test code")]
mod tests {
    use super::*;
    use crate::buffer::StringBuffer;
    use crate::dialect::Dialect;

    fn parse_text(text: &str) -> (StringBuffer, ParseReport) {
        let mut buffer = StringBuffer::new(text);
        let report = parse(&mut buffer, &Scanner::new(Dialect::BlockComment)).unwrap();
        return (buffer, report);
    }

    fn kinds(report: &ParseReport) -> Vec<CorruptionKind> {
        return report.corruptions.iter().map(|c| return c.kind).collect();
    }

    #[test]
    fn clean_buffer_parses_without_changes() {
        let text = "a();\nb(); /*?K*/\nc();\nd(); /*K?*/\ne();\n";
        let (buffer, report) = parse_text(text);
        assert_eq!(buffer.text(), text, "nothing deleted");
        assert!(!report.repaired(), "no corruption");
        assert_eq!(report.passes, 1, "single pass");
        let span = report.index.span_of("K").unwrap();
        assert_eq!(span.start, 5, "starts at begin line");
        assert_eq!(span.end, 33, "ends at end of end-line content");
    }

    #[test]
    fn clean_parse_is_idempotent() {
        let text = "x /*?A*/\ny /*?B?*/\nz /*A?*/\n";
        let (mut buffer, first) = parse_text(text);
        let second = parse(&mut buffer, &Scanner::new(Dialect::BlockComment)).unwrap();
        assert_eq!(first.index, second.index, "same index twice");
        assert_eq!(buffer.text(), text, "no text deleted");
    }

    #[test]
    fn duplicate_begin_is_deleted() {
        let (buffer, report) = parse_text("a /*?K*/\nb /*?K*/\nc /*K?*/\n");
        assert_eq!(buffer.text(), "a /*?K*/\nb \nc /*K?*/\n", "second begin removed");
        assert_eq!(kinds(&report), vec![CorruptionKind::DuplicateBegin], "one repair");
        assert_eq!(report.index.len(), 1, "one pair left");
        let tags = report.index.tag_positions("K").unwrap();
        assert_eq!(tags.begin.offset, 2, "first begin kept");
    }

    #[test]
    fn duplicate_end_is_deleted() {
        let (buffer, report) = parse_text("/*?K*/\n/*K?*/\n/*K?*/\n");
        assert_eq!(buffer.text(), "/*?K*/\n/*K?*/\n\n", "second end removed");
        assert_eq!(kinds(&report), vec![CorruptionKind::DuplicateEnd], "one repair");
    }

    #[test]
    fn end_without_begin_is_deleted() {
        let (buffer, report) = parse_text("/*K?*/\n/*?K*/\n/*K?*/\n");
        assert_eq!(buffer.text(), "\n/*?K*/\n/*K?*/\n", "leading orphan end removed");
        assert_eq!(kinds(&report), vec![CorruptionKind::EndWithoutBegin], "one repair");
        assert!(report.index.contains("K"), "remaining pair indexed");
    }

    #[test]
    fn dangling_begin_is_deleted_and_not_indexed() {
        let (buffer, report) = parse_text("keep();\nlost(); /*?K*/\n");
        assert_eq!(buffer.text(), "keep();\nlost(); \n", "begin removed");
        assert_eq!(kinds(&report), vec![CorruptionKind::DanglingBegin], "one repair");
        assert!(report.index.is_empty(), "no entry for K");
        assert_eq!(report.passes, 2, "rescanned after deleting");
    }

    #[test]
    fn dangling_begins_are_deleted_from_the_back() {
        let (buffer, report) = parse_text("/*?A*/ x /*?B*/ y /*?C?*/ z /*?D*/");
        assert_eq!(buffer.text(), " x  y /*?C?*/ z ", "all three dangling begins removed");
        let keys: Vec<&str> = report.corruptions.iter().map(|c| return c.key.as_str()).collect();
        assert_eq!(keys, vec!["D", "B", "A"], "descending offset order");
        assert!(report.index.contains("C"), "self-contained marker survives");
    }

    #[test]
    fn dangling_begins_of_different_lengths_keep_surrounding_text() {
        let (buffer, report) = parse_text("/*?LONGKEY*/ x /*?K*/ y\n");
        assert_eq!(buffer.text(), " x  y\n", "both begins removed, code intact");
        let keys: Vec<&str> = report.corruptions.iter().map(|c| return c.key.as_str()).collect();
        assert_eq!(keys, vec!["K", "LONGKEY"], "later marker deleted first");
    }

    #[test]
    fn self_contained_marker_spans_its_line() {
        let (_, report) = parse_text("one\ntwo(); /*?K?*/\r\nthree\n");
        let tags = report.index.tag_positions("K").unwrap();
        assert!(tags.is_self_contained(), "begin == end");
        assert_eq!(report.index.span_of("K"), Some(AnnotatedSpan { end: 18, start: 4 }), "line 1 only");
    }

    #[test]
    fn self_contained_after_begin_is_a_duplicate_begin() {
        let (buffer, report) = parse_text("/*?K*/\n/*?K?*/\n/*K?*/");
        assert_eq!(buffer.text(), "/*?K*/\n\n/*K?*/", "self-contained duplicate removed");
        assert_eq!(kinds(&report), vec![CorruptionKind::DuplicateBegin], "one repair");
    }

    #[test]
    fn repaired_buffer_reparses_cleanly() {
        let (mut buffer, first) =
            parse_text("/*K?*/ /*?K*/ /*?K*/ /*?J*/ /*K?*/ /*K?*/ /*?L?*/ /*?L?*/");
        assert!(first.repaired(), "garbage needed repairs");
        let second = parse(&mut buffer, &Scanner::new(Dialect::BlockComment)).unwrap();
        assert!(!second.repaired(), "fixed point reached");
        assert_eq!(first.index, second.index, "same index after reparse");
        assert_eq!(second.index.keys().collect::<Vec<_>>(), vec!["K", "L"], "valid keys survive");
    }
}
