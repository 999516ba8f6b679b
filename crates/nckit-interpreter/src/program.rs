//! Loaded program text

use std::path::Path;

/// File extensions the viewer was built for
pub const KNOWN_EXTENSIONS: [&str; 2] = ["nc", "tap"];

/// Full source text plus its identity, addressed by 0-based line
///
/// Immutable once built; loading new text creates a new `Program`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    identity: String,
    text: String,
    lines: Vec<String>,
}

impl Program {
    /// Split text into lines on `\n`, dropping a trailing `\r` from each
    pub fn new(text: impl Into<String>, identity: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self {
            identity: identity.into(),
            text,
            lines,
        }
    }

    /// Read a program from disk; the identity is the path as given
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(text, path.display().to_string()))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().map(String::as_str).enumerate()
    }
}

/// Whether a path has one of the extensions in [`KNOWN_EXTENSIONS`]
pub fn has_known_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            KNOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
