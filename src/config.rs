use std::collections::BTreeMap;
use std::path::Path;

use crate::dialect::Dialect;
use crate::error::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = ".reviewtag.toml";

/// Separator used between key components when none is configured.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Extensions whose files use `/* */` markers out of the box.
const DEFAULT_BLOCK_EXTENSIONS: &[&str] = &[
    "c", "cpp", "cs", "css", "go", "h", "hpp", "java", "js", "kt", "rs", "scala", "swift", "ts",
];

/// Extensions whose files use `<!-- -->` markers out of the box.
const DEFAULT_MARKUP_EXTENSIONS: &[&str] = &["htm", "html", "svg", "xhtml", "xml"];

/// Project configuration loaded from `.reviewtag.toml`.
/// Include/exclude patterns are path prefixes applied by `clean`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path prefixes never visited by `clean`.
    exclude: Vec<String>,
    /// Extension (without dot) to marker dialect.
    file_types: BTreeMap<String, Dialect>,
    /// Path prefixes visited by `clean`; empty means everything.
    include: Vec<String>,
    /// Token joining review id, author, and comment id into a key.
    separator: String,
}

/// Raw TOML structure for `.reviewtag.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ReviewtagTomlConfig {
    /// Path prefixes to skip.
    #[serde(default)]
    exclude: Vec<String>,
    /// Extra or overriding extension mappings.
    #[serde(default)]
    file_types: BTreeMap<String, Dialect>,
    /// Path prefixes to visit.
    #[serde(default)]
    include: Vec<String>,
    /// Key separator override.
    separator: Option<String>,
}

impl Default for Config {
    /// Built-in file types, `|` separator, no path filters.
    fn default() -> Self {
        let block = DEFAULT_BLOCK_EXTENSIONS.iter().map(|ext| return (ext, Dialect::BlockComment));
        let markup = DEFAULT_MARKUP_EXTENSIONS.iter().map(|ext| return (ext, Dialect::MarkupComment));
        let file_types = block
            .chain(markup)
            .map(|(ext, dialect)| return ((*ext).to_string(), dialect))
            .collect();
        return Self {
            exclude: Vec::new(),
            file_types,
            include: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
        };
    }
}

impl Config {
    /// Dialect configured for a file extension (case-insensitive, no leading dot).
    pub fn dialect_for_extension(&self, ext: &str) -> Option<Dialect> {
        return self.file_types.get(&ext.to_ascii_lowercase()).copied();
    }

    /// Load config from `.reviewtag.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or `Error::InvalidKey` if the
    /// configured separator cannot appear inside a marker.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Build a config from TOML text, layering it over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed, or `Error::InvalidKey`
    /// if the separator is empty or contains a character markers forbid.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: ReviewtagTomlConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(separator) = raw.separator {
            crate::key::validate_marker_text(&separator)?;
            config.separator = separator;
        }
        for (ext, dialect) in raw.file_types {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            config.file_types.insert(ext, dialect);
        }
        config.include = raw.include;
        config.exclude = raw.exclude;

        return Ok(config);
    }

    /// Token joining key components.
    pub fn separator(&self) -> &str {
        return &self.separator;
    }

    /// Check whether a file path should be visited by `clean`.
    ///
    /// A path is included if no include patterns are set (visit everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
