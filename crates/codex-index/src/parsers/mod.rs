//! Index file parsers
//!
//! Turns raw YAML or JSON bytes into an [`IndexDocument`] and back. Both
//! formats share the same logical schema; the parser only decides syntax.
//! Include classification and identity defaults happen once, in
//! [`IndexDocument::from_raw`].

use crate::error::{ParseError, SerializeError};
use codex_model::{IndexDocument, IndexFormat, RawIndex};
use std::path::Path;

mod json;
mod yaml;

pub use json::JsonParser;
pub use yaml::YamlParser;

/// Parser trait for one index file format
pub trait IndexParser: Send + Sync + 'static {
    /// Format this parser reads and writes
    fn format(&self) -> IndexFormat;

    /// Parse bytes into a document; `origin` names the file for errors and
    /// identity defaults
    ///
    /// # Errors
    /// Returns [`ParseError`] for invalid syntax, encoding, or shape
    fn parse(&self, content: &[u8], origin: &Path) -> Result<IndexDocument, ParseError>;

    /// Serialize a document in this format
    ///
    /// # Errors
    /// Returns [`SerializeError`] if the emitter fails
    fn serialize(&self, doc: &IndexDocument) -> Result<Vec<u8>, SerializeError>;

    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str];

    /// Check if this parser can handle the given path
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }
}

/// Parsers keyed by format and extension
pub struct ParserRegistry {
    parsers: Vec<Box<dyn IndexParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        default_parsers()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("extensions", &self.all_extensions())
            .finish()
    }
}

impl ParserRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Register a parser, replacing any earlier one for the same format
    pub fn register<P: IndexParser>(&mut self, parser: P) {
        self.parsers.retain(|p| p.format() != parser.format());
        self.parsers.push(Box::new(parser));
    }

    /// Parser for a path, by extension
    #[must_use]
    pub fn find_for_path(&self, path: &Path) -> Option<&dyn IndexParser> {
        self.parsers.iter().find(|p| p.can_parse(path)).map(|p| &**p)
    }

    /// Parser for a format
    #[must_use]
    pub fn for_format(&self, format: IndexFormat) -> Option<&dyn IndexParser> {
        self.parsers.iter().find(|p| p.format() == format).map(|p| &**p)
    }

    /// All registered extensions
    #[must_use]
    pub fn all_extensions(&self) -> Vec<&str> {
        self.parsers
            .iter()
            .flat_map(|p| p.extensions())
            .copied()
            .collect()
    }

    /// Parse a file's bytes with the parser its extension selects
    ///
    /// # Errors
    /// Returns [`ParseError::NoParser`] for unknown extensions, otherwise the
    /// parser's own error
    pub fn parse_path(&self, content: &[u8], path: &Path) -> Result<IndexDocument, ParseError> {
        self.find_for_path(path)
            .ok_or_else(|| ParseError::NoParser(path.to_path_buf()))?
            .parse(content, path)
    }
}

/// Registry with the built-in YAML and JSON parsers
#[must_use]
pub fn default_parsers() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(YamlParser);
    registry.register(JsonParser);
    registry
}

/// Parse index content in the given format
///
/// # Errors
/// Returns [`ParseError`] naming `origin` on malformed input
pub fn parse_index(content: &[u8], format: IndexFormat, origin: &Path) -> Result<IndexDocument, ParseError> {
    match format {
        IndexFormat::Yaml => YamlParser.parse(content, origin),
        IndexFormat::Json => JsonParser.parse(content, origin),
    }
}

/// Serialize a document in the given format
///
/// # Errors
/// Returns [`SerializeError`] if the emitter fails
pub fn serialize_index(doc: &IndexDocument, format: IndexFormat) -> Result<Vec<u8>, SerializeError> {
    match format {
        IndexFormat::Yaml => YamlParser.serialize(doc),
        IndexFormat::Json => JsonParser.serialize(doc),
    }
}

fn is_blank(content: &[u8]) -> bool {
    content.iter().all(u8::is_ascii_whitespace)
}

fn decode<'a>(content: &'a [u8], origin: &Path) -> Result<&'a str, ParseError> {
    let text = std::str::from_utf8(content).map_err(|_| ParseError::Encoding {
        path: origin.to_path_buf(),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

fn into_document(raw: RawIndex, origin: &Path) -> IndexDocument {
    for include in raw.includes_with_children() {
        tracing::warn!(
            file = %origin.display(),
            include = %include,
            "include entry declares children; they are ignored"
        );
    }
    IndexDocument::from_raw(raw, origin)
}

fn empty_document(origin: &Path) -> IndexDocument {
    tracing::debug!(file = %origin.display(), "empty index file");
    IndexDocument::empty_for(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_model::ChildNode;

    #[test]
    fn registry_selects_by_extension() {
        let registry = default_parsers();
        assert_eq!(
            registry.find_for_path(Path::new("index.codex.json")).map(|p| p.format()),
            Some(IndexFormat::Json)
        );
        assert_eq!(
            registry.find_for_path(Path::new(".index.codex.yml")).map(|p| p.format()),
            Some(IndexFormat::Yaml)
        );
        assert!(registry.find_for_path(Path::new("notes.md")).is_none());
    }

    #[test]
    fn registering_same_format_replaces() {
        let mut registry = default_parsers();
        registry.register(YamlParser);
        assert_eq!(registry.all_extensions().len(), 3);
    }

    #[test]
    fn parse_path_rejects_unknown_extension() {
        let err = default_parsers()
            .parse_path(b"id: x", Path::new("/ws/index.toml"))
            .unwrap_err();
        assert!(matches!(err, ParseError::NoParser(_)));
    }

    #[test]
    fn yaml_and_json_agree() {
        let yaml = b"id: root\nchildren:\n  - include: ./book/index.codex.json\n  - include: ./notes.md\n";
        let json = br#"{"id":"root","children":[{"include":"./book/index.codex.json"},{"include":"./notes.md"}]}"#;
        let origin = Path::new("/ws/index.codex.yaml");

        let a = parse_index(yaml, IndexFormat::Yaml, origin).unwrap();
        let b = parse_index(json, IndexFormat::Json, origin).unwrap();
        assert_eq!(a, b);
        assert!(matches!(a.children[0], ChildNode::SubIndex(_)));
    }

    #[test]
    fn blank_content_is_an_empty_document() {
        for format in [IndexFormat::Yaml, IndexFormat::Json] {
            let doc = parse_index(b"  \n", format, Path::new("/ws/Book/index.codex.yaml")).unwrap();
            assert_eq!(doc.id, "book");
            assert!(doc.children.is_empty());
        }
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let err = parse_index(&[0xff, 0xfe, b'a'], IndexFormat::Yaml, Path::new("x.yaml")).unwrap_err();
        assert!(matches!(err, ParseError::Encoding { .. }));
    }
}
