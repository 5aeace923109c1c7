//! YAML index parser

use super::{decode, empty_document, into_document, is_blank, IndexParser};
use crate::error::{ParseError, Position, SerializeError};
use codex_model::{IndexDocument, IndexFormat, RawIndex};
use std::path::Path;

/// Parser for `index.codex.yaml` / `.index.codex.yaml`
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl IndexParser for YamlParser {
    fn format(&self) -> IndexFormat {
        IndexFormat::Yaml
    }

    fn parse(&self, content: &[u8], origin: &Path) -> Result<IndexDocument, ParseError> {
        if is_blank(content) {
            return Ok(empty_document(origin));
        }
        let text = decode(content, origin)?;

        let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
            let position = e.location().map(|l| Position {
                line: l.line(),
                column: l.column(),
            });
            ParseError::syntax(origin, position, e.to_string())
        })?;

        // A file holding only comments parses to null
        if value.is_null() {
            return Ok(empty_document(origin));
        }

        let raw: RawIndex =
            serde_yaml::from_value(value).map_err(|e| ParseError::shape(origin, e.to_string()))?;
        Ok(into_document(raw, origin))
    }

    fn serialize(&self, doc: &IndexDocument) -> Result<Vec<u8>, SerializeError> {
        Ok(serde_yaml::to_string(&doc.to_raw())?.into_bytes())
    }

    fn extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}
