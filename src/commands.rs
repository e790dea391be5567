//! Core CLI commands for reviewtag: scan, add, remove, clean.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use walkdir::WalkDir;

use reviewtag::diagnostics;
use reviewtag::{
    Config, Corruption, Error, FileBuffer, LineSelection, ReviewKey, Session, TextBuffer,
    dialect_for_path,
};

/// One annotated span as printed by `scan`.
#[derive(Serialize)]
struct SpanEntry {
    /// Comment author, when the key splits into review components.
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    /// Comment id, when the key splits into review components.
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_id: Option<String>,
    /// Byte offset one past the last covered byte.
    end: usize,
    /// 1-based last covered line.
    end_line: usize,
    /// Marker key.
    key: String,
    /// Review id, when the key splits into review components.
    #[serde(skip_serializing_if = "Option::is_none")]
    review_id: Option<String>,
    /// Byte offset of the first covered byte.
    start: usize,
    /// 1-based first covered line.
    start_line: usize,
}

/// Machine-readable result of `scan`.
#[derive(Serialize)]
struct ScanOutput<'a> {
    /// File that was scanned.
    file: &'a Path,
    /// Markers deleted by the repair engine.
    repairs: &'a [Corruption],
    /// Annotated spans after repair.
    spans: Vec<SpanEntry>,
}

/// Insert markers for a comment over a 1-based line range.
///
/// # Errors
///
/// Returns `Error::NoActiveSelection` if `lines` is not a valid range, and
/// errors from config loading, key composition, parsing, or saving.
pub fn add(file: &str, key: &ReviewKey, lines: &str) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let composed = key.compose(config.separator())?;

    let path = PathBuf::from(file);
    let mut session = open_session(&path, &config)?;
    let report = session.parse()?;
    print_repairs(&report.corruptions);

    let selection = parse_line_range(lines);
    let span = session.insert(&composed, selection)?;
    let first = session.buffer().line_of_offset(span.start)?.saturating_add(1);
    let last = session.buffer().line_of_offset(span.end)?.saturating_add(1);
    eprintln!("Tagged {key} in {} (lines {first}-{last})", path.display());

    return Ok(());
}

/// Remove markers from every supported file under the working directory.
/// With no keys, every marker goes; otherwise only the listed keys.
///
/// # Errors
///
/// Returns errors from config loading or from saving a modified file.
/// Files that cannot be read as text are skipped with a warning.
pub fn clean(keys: &[String]) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let mut files_changed = 0_usize;
    let mut markers_removed = 0_usize;

    for path in collect_supported_files(&root, &config) {
        let mut session = match open_session(&path, &config) {
            Err(Error::Io(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            },
            Err(e) => return Err(e),
            Ok(s) => s,
        };
        let report = session.parse()?;
        let before = session.index().len();

        if keys.is_empty() {
            session.remove_all()?;
        } else {
            session.remove_many(keys)?;
        }

        let removed = before.saturating_sub(session.index().len());
        if removed == 0 && !report.repaired() {
            continue;
        }
        if removed == 0 {
            session.save()?;
        }
        files_changed = files_changed.saturating_add(1);
        markers_removed = markers_removed.saturating_add(removed);
        eprintln!("clean: {}  ({removed} removed, {} repaired)", path.display(), report.corruptions.len());
    }

    eprintln!("Removed {markers_removed} comment tags from {files_changed} files");
    return Ok(());
}

/// Every file under `root` whose extension has a dialect and whose path
/// passes the include/exclude filters. Hidden directories are skipped.
fn collect_supported_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| return dialect_for_path(e.path(), config).is_ok())
        .filter(|e| {
            let relative = e.path().strip_prefix(root).unwrap_or(e.path());
            return config.should_scan(&relative.to_string_lossy());
        })
        .map(|e| return e.path().to_path_buf())
        .collect();
    files.sort();
    return files;
}

/// Resolve the dialect for `path` and open a session over its contents.
///
/// # Errors
///
/// Returns `Error::UnsupportedFileType`, `Error::FileNotFound`, or `Error::Io`.
pub fn open_session(path: &Path, config: &Config) -> Result<Session<FileBuffer>, Error> {
    let dialect = dialect_for_path(path, config)?;
    let buffer = FileBuffer::open(path)?;
    return Ok(Session::open(buffer, dialect));
}

/// Parse `S` or `S:E` (1-based, inclusive) into a zero-based selection.
/// Returns `None` for anything else, including line 0.
fn parse_line_range(lines: &str) -> Option<LineSelection> {
    let (start, end) = match lines.split_once(':') {
        None => (lines, lines),
        Some((start, end)) => (start, end),
    };
    let start: usize = start.trim().parse().ok()?;
    let end: usize = end.trim().parse().ok()?;
    return Some(LineSelection::new(start.checked_sub(1)?, end.checked_sub(1)?));
}

/// Print a repair report to stderr when the parse changed the buffer.
fn print_repairs(corruptions: &[Corruption]) {
    let md = diagnostics::render_repairs(corruptions);
    if !md.is_empty() {
        diagnostics::print_markdown(&md);
    }
    return;
}

/// Remove the markers of one comment.
///
/// # Errors
///
/// Returns errors from config loading, key composition, parsing, or saving.
pub fn remove(file: &str, key: &ReviewKey) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let composed = key.compose(config.separator())?;

    let path = PathBuf::from(file);
    let mut session = open_session(&path, &config)?;
    let report = session.parse()?;
    print_repairs(&report.corruptions);

    if !session.index().contains(&composed) {
        if report.repaired() {
            session.save()?;
        }
        eprintln!("No tags for {key} in {}", path.display());
        return Ok(());
    }

    session.remove(&composed)?;
    eprintln!("Removed {key} from {}", path.display());
    return Ok(());
}

/// Parse a file, persist any repairs, and print its annotated spans.
/// Exit code 1 signals that the file needed repairs.
///
/// # Errors
///
/// Returns errors from config loading, parsing, saving, or serialization.
pub fn scan(file: &str, format: &str) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let path = PathBuf::from(file);
    return scan_path(&path, &config, format);
}

/// `scan` for an already loaded config; shared with `watch`.
///
/// # Errors
///
/// Returns errors from parsing, saving, or serialization.
pub fn scan_path(path: &Path, config: &Config, format: &str) -> Result<ExitCode, Error> {
    let mut session = open_session(path, config)?;
    let report = session.parse()?;
    if report.repaired() {
        session.save()?;
    }

    let buffer = session.buffer();
    let mut spans = Vec::with_capacity(report.index.len());
    for (key, span) in report.index.spans() {
        let review = ReviewKey::split(key, config.separator());
        spans.push(SpanEntry {
            author: review.as_ref().map(|r| return r.author.clone()),
            comment_id: review.as_ref().map(|r| return r.comment_id.clone()),
            end: span.end,
            end_line: buffer.line_of_offset(span.end)?.saturating_add(1),
            key: key.clone(),
            review_id: review.map(|r| return r.review_id),
            start: span.start,
            start_line: buffer.line_of_offset(span.start)?.saturating_add(1),
        });
    }

    if format == "json" {
        let output = ScanOutput { file: buffer.path(), repairs: &report.corruptions, spans };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for entry in &spans {
            println!("{}  lines {}-{}", entry.key, entry.start_line, entry.end_line);
        }
        print_repairs(&report.corruptions);
    }

    if report.repaired() {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_based_line_ranges() {
        assert_eq!(parse_line_range("3"), Some(LineSelection::single(2)), "single line");
        assert_eq!(parse_line_range("2:5"), Some(LineSelection::new(1, 4)), "range");
        assert_eq!(parse_line_range("0"), None, "line numbers start at 1");
        assert_eq!(parse_line_range("a:b"), None, "not numbers");
    }
}
