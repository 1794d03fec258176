//! JSON loader producing a `Document` with source positions.
//!
//! `serde_json` validates the input and decodes every literal; the scanner
//! here only finds token boundaries and tracks line/column so each node gets
//! its 1-indexed span. Columns count characters, not bytes. A mapping entry's
//! node spans from its key to the end of its value.

use crate::error::LintError;
use crate::models::{Document, DocumentNode, Position, Scalar};
use serde_json::Value as Json;
use std::fs;
use std::path::Path;

/// Parse JSON text into a positioned document.
pub fn parse_json(source: &str, file: &str) -> Result<Document, LintError> {
    let parse_err = |message: String| LintError::Parse {
        file: file.to_string(),
        message,
    };
    serde_json::from_str::<serde::de::IgnoredAny>(source).map_err(|e| parse_err(e.to_string()))?;
    let mut sc = Scanner::new(source);
    sc.skip_ws();
    let root = sc.value().map_err(parse_err)?;
    Ok(Document::new(root))
}

/// Read and parse a JSON file.
pub fn load_json(path: &Path) -> Result<Document, LintError> {
    let source = fs::read_to_string(path).map_err(|source| LintError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    parse_json(&source, &path.to_string_lossy())
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    /// Line/column of the last consumed character.
    last: (usize, usize),
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            last: (1, 1),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn here(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    fn span_from(&self, start: (usize, usize)) -> Position {
        Position::new(start.0, start.1, self.last.0, self.last.1)
    }

    /// Consume one byte, updating line/column on character boundaries.
    fn bump(&mut self) {
        let Some(b) = self.peek() else {
            return;
        };
        self.pos += 1;
        if b & 0xC0 == 0x80 {
            return;
        }
        self.last = (self.line, self.col);
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn expect(&mut self, want: u8) -> Result<(), String> {
        match self.peek() {
            Some(b) if b == want => {
                self.bump();
                Ok(())
            }
            Some(b) => Err(format!(
                "expected '{}' but found '{}' at {}:{}",
                want as char, b as char, self.line, self.col
            )),
            None => Err(format!("expected '{}' but input ended", want as char)),
        }
    }

    fn value(&mut self) -> Result<DocumentNode, String> {
        let start = self.here();
        match self.peek() {
            Some(b'{') => self.mapping(start),
            Some(b'[') => self.sequence(start),
            Some(b'"') => {
                let s = self.string()?;
                Ok(DocumentNode::scalar(Scalar::String(s), self.span_from(start)))
            }
            Some(_) => {
                let begin = self.pos;
                while !matches!(
                    self.peek(),
                    None | Some(b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}' | b':')
                ) {
                    self.bump();
                }
                let literal = &self.src[begin..self.pos];
                let scalar = match serde_json::from_str::<Json>(literal).map_err(|e| e.to_string())? {
                    Json::Null => Scalar::Null,
                    Json::Bool(b) => Scalar::Bool(b),
                    Json::Number(n) => Scalar::Number(n),
                    other => return Err(format!("unexpected literal {}", other)),
                };
                Ok(DocumentNode::scalar(scalar, self.span_from(start)))
            }
            None => Err("unexpected end of input".to_string()),
        }
    }

    /// Consume a string literal and decode it.
    fn string(&mut self) -> Result<String, String> {
        let begin = self.pos;
        self.expect(b'"')?;
        loop {
            match self.peek() {
                None => return Err("unterminated string".to_string()),
                Some(b'\\') => {
                    self.bump();
                    self.bump();
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(_) => self.bump(),
            }
        }
        serde_json::from_str(&self.src[begin..self.pos]).map_err(|e| e.to_string())
    }

    fn mapping(&mut self, start: (usize, usize)) -> Result<DocumentNode, String> {
        self.expect(b'{')?;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.bump();
            return Ok(DocumentNode::mapping(entries, self.span_from(start)));
        }
        loop {
            self.skip_ws();
            let key_start = self.here();
            let key = self.string()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.value()?;
            let span = self.span_from(key_start);
            entries.push((key, value.with_position(span)));
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.bump(),
                _ => {
                    self.expect(b'}')?;
                    break;
                }
            }
        }
        Ok(DocumentNode::mapping(entries, self.span_from(start)))
    }

    fn sequence(&mut self, start: (usize, usize)) -> Result<DocumentNode, String> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.bump();
            return Ok(DocumentNode::sequence(items, self.span_from(start)));
        }
        loop {
            self.skip_ws();
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.bump(),
                _ => {
                    self.expect(b']')?;
                    break;
                }
            }
        }
        Ok(DocumentNode::sequence(items, self.span_from(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeKind, PathSegment};

    const SRC: &str = r#"{
  "title": "Spec",
  "sections": [
    {"title": "Intro"},
    {"title": "bäckground"}
  ],
  "version": 2
}"#;

    #[test]
    fn test_positions_are_one_indexed() {
        let doc = parse_json(SRC, "spec.json").unwrap();
        assert_eq!(doc.root().position(), Position::new(1, 1, 8, 1));

        let title = doc.resolve(&["title".into()]).unwrap();
        assert_eq!(title.position(), Position::new(2, 3, 2, 17));

        let path: Vec<PathSegment> = vec!["sections".into(), 1usize.into(), "title".into()];
        let nested = doc.resolve(&path).unwrap();
        assert_eq!(nested.position().start_line, 5);
        assert_eq!(nested.position().start_column, 6);
        assert_eq!(nested.value().and_then(Scalar::as_str), Some("bäckground"));
        // columns count characters: "title": "bäckground" ends at column 26
        assert_eq!(nested.position().end_column, 26);

        let sections = doc.resolve(&["sections".into()]).unwrap();
        assert_eq!(sections.kind(), NodeKind::Sequence);
        assert_eq!((sections.position().start_line, sections.position().end_line), (3, 6));
    }

    #[test]
    fn test_scalars_decode_through_serde_json() {
        let doc = parse_json(r#"[1, -2.5e3, true, null, "a\"bé"]"#, "x.json").unwrap();
        let values: Vec<String> = doc
            .root()
            .items()
            .iter()
            .filter_map(|n| n.value().map(|v| v.to_string()))
            .collect();
        assert_eq!(values, ["1", "-2500.0", "true", "null", "a\"bé"]);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_json("{\"a\": }", "bad.json").unwrap_err();
        match err {
            LintError::Parse { file, message } => {
                assert_eq!(file, "bad.json");
                assert!(message.contains("line 1"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_containers() {
        let doc = parse_json("{\"a\": [], \"b\": {}}", "e.json").unwrap();
        assert!(doc.resolve(&["a".into()]).unwrap().items().is_empty());
        assert_eq!(doc.resolve(&["b".into()]).unwrap().kind(), NodeKind::Mapping);
    }
}
