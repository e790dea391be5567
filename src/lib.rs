//! Review comments anchored to code through inline markers.
//!
//! Markers are disguised as comments of the host language (`/*?KEY*/` and
//! `/*KEY?*/`, or `<!--?KEY-->` and `<!--KEY?-->`) so the link between a
//! comment and the code it covers travels with the file. A [`Session`]
//! scans a buffer for markers, repairs malformed sequences in place, and
//! keeps an index from keys to the line-aligned spans they annotate.

pub mod buffer;
pub mod config;
pub mod diagnostics;
pub mod dialect;
pub mod error;
pub mod index;
pub mod key;
pub mod repair;
pub mod scanner;
pub mod session;
pub mod sink;
pub mod types;

pub use buffer::{FileBuffer, StringBuffer, TextBuffer};
pub use config::Config;
pub use dialect::{Dialect, dialect_for_path};
pub use error::Error;
pub use index::PositionIndex;
pub use key::ReviewKey;
pub use repair::ParseReport;
pub use session::Session;
pub use sink::{AnnotationSink, NullSink};
pub use types::{AnnotatedSpan, Corruption, CorruptionKind, LineSelection, Marker, Span, TagPositions};
