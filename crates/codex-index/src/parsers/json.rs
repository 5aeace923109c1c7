//! JSON index parser

use super::{decode, empty_document, into_document, is_blank, IndexParser};
use crate::error::{ParseError, Position, SerializeError};
use codex_model::{IndexDocument, IndexFormat, RawIndex};
use std::path::Path;

/// Parser for `index.codex.json` / `.index.codex.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl IndexParser for JsonParser {
    fn format(&self) -> IndexFormat {
        IndexFormat::Json
    }

    fn parse(&self, content: &[u8], origin: &Path) -> Result<IndexDocument, ParseError> {
        if is_blank(content) {
            return Ok(empty_document(origin));
        }
        let text = decode(content, origin)?;

        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            let position = (e.line() > 0).then(|| Position {
                line: e.line(),
                column: e.column(),
            });
            ParseError::syntax(origin, position, e.to_string())
        })?;

        if value.is_null() {
            return Ok(empty_document(origin));
        }

        let raw: RawIndex =
            serde_json::from_value(value).map_err(|e| ParseError::shape(origin, e.to_string()))?;
        Ok(into_document(raw, origin))
    }

    fn serialize(&self, doc: &IndexDocument) -> Result<Vec<u8>, SerializeError> {
        let mut out = serde_json::to_vec_pretty(&doc.to_raw())?;
        out.push(b'\n');
        Ok(out)
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codex_model::ChildNode;

    const ORIGIN: &str = "/ws/book-2/index.codex.json";

    #[test]
    fn parses_includes_and_overrides() {
        let json = br#"{
  "id": "book-2",
  "children": [
    { "include": "./part-1/.index.codex.yaml", "name": "Part One", "order": 2 },
    { "include": "./prologue.md", "order": 1 }
  ]
}"#;
        let doc = JsonParser.parse(json, Path::new(ORIGIN)).unwrap();
        let ChildNode::SubIndex(part) = &doc.children[0] else { panic!("expected sub-index") };
        assert_eq!(part.meta.order, Some(2));
        assert!(matches!(doc.children[1], ChildNode::Leaf(_)));
    }

    #[test]
    fn syntax_error_has_line_and_column() {
        let err = JsonParser.parse(b"{\n  \"id\": \n}", Path::new(ORIGIN)).unwrap_err();
        let position = err.position().unwrap();
        assert_eq!(position.line, 3);
    }

    #[test]
    fn non_object_is_a_shape_error() {
        let err = JsonParser.parse(b"[1, 2]", Path::new(ORIGIN)).unwrap_err();
        assert!(matches!(err, ParseError::Shape { .. }));
    }

    #[test]
    fn serialized_output_ends_with_newline_and_reparses() {
        let doc = JsonParser
            .parse(br#"{"id":"x","children":[{"include":"./a.md"}],"author":"Ann"}"#, Path::new(ORIGIN))
            .unwrap();
        let bytes = JsonParser.serialize(&doc).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(JsonParser.parse(&bytes, Path::new(ORIGIN)).unwrap(), doc);
    }
}
