/// Crate-level error types for reviewtag diagnostics.
use std::path::PathBuf;

/// All errors in reviewtag carry enough context to produce a useful diagnostic
/// without a debugger. Structural marker corruption is not an error: the
/// repair engine fixes it and reports it through `ParseReport`.
#[allow(clippy::error_impl_error, reason = "crate-wide error type, re-exported by name")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file passed on the command line does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A key or key component cannot be embedded in a marker.
    #[error("invalid key `{key}`: {reason}")]
    InvalidKey {
        /// The offending key or key component.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A marker pair for this key is already present in the buffer.
    #[error("key already tagged: `{key}`")]
    KeyExists {
        /// The duplicated key.
        key: String,
    },

    /// The buffer reported an offset or length that does not fit its text.
    /// The previously published index stays authoritative.
    #[error("malformed document state: {reason}")]
    MalformedDocumentState {
        /// Description of the inconsistent access.
        reason: String,
    },

    /// Insertion was requested without an addressable line range.
    #[error("no active selection")]
    NoActiveSelection,

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No marker dialect is configured for this file extension.
    #[error("unsupported file type: .{ext}")]
    UnsupportedFileType {
        /// File extension without the leading dot.
        ext: String,
    },

    /// The filesystem watcher could not be set up.
    #[error("watch: {0}")]
    Watch(
        /// The wrapped notify error.
        #[from]
        notify::Error,
    ),
}
