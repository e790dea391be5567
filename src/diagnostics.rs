use std::fmt::Write as _;

use crate::error::Error;
use crate::types::Corruption;

/// ANSI bold, used for markdown headings on the terminal.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Print markdown to stderr with bold headings.
pub fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened, why, and how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::InvalidKey { key, reason } => render_invalid_key(key, reason),
        Error::KeyExists { key } => render_key_exists(key),
        Error::MalformedDocumentState { reason } => render_malformed_document(reason),
        Error::NoActiveSelection => render_no_active_selection(),
        Error::UnsupportedFileType { ext } => render_unsupported_file_type(ext),
        _ => render_generic(e),
    };
}

/// Fallback rendering for I/O and parsing errors.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON Serialization

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.reviewtag.toml`.
"),
        Error::Watch(e) => format!("\
# Error: Watch Failed

{e}
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    };
}

/// Explain a key that cannot be embedded in a marker.
fn render_invalid_key(key: &str, reason: &str) -> String {
    return format!("\
# Error: Invalid Key

`{key}` {reason}.

Keys are embedded in comment markers and must not be empty or contain
`?`, `*`, or line breaks. Components must not contain the key separator.
");
}

/// Explain an attempt to tag a key twice.
fn render_key_exists(key: &str) -> String {
    return format!("\
# Error: Key Already Tagged

`{key}` already has markers in this file.

## Fix

Remove the existing markers first:

    reviewtag remove <file> --review <id> --author <name> --comment <id>
");
}

/// Explain a buffer access that did not fit the text.
fn render_malformed_document(reason: &str) -> String {
    return format!("\
# Error: Malformed Document State

{reason}

The file probably changed while it was being processed. Nothing was
published; run the command again.
");
}

/// Explain a missing line range.
fn render_no_active_selection() -> String {
    return "\
# Error: No Active Selection

No valid line range was given, or the range ends past the last line.

## Fix

Pass a 1-based range that exists in the file:

    reviewtag add <file> --lines 3:7 ...
"
    .to_string();
}

/// Render repaired corruptions as a markdown list. Empty when nothing was repaired.
pub fn render_repairs(corruptions: &[Corruption]) -> String {
    if corruptions.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Repaired markers\n\n");
    for c in corruptions {
        let _ = writeln!(out, "- `{}`: {} (offset {})", c.key, c.kind, c.span.offset);
    }
    return out;
}

/// Explain an extension without a configured dialect.
fn render_unsupported_file_type(ext: &str) -> String {
    return format!(
        "\
# Error: Unsupported File Type

No marker dialect for `.{ext}` files.

## Fix

Map the extension in `.reviewtag.toml`:

    [file-types]
    {ext} = \"block-comment\"    # or \"markup-comment\"
"
    );
}
