//! Parsed document tree consumed by rules.
//!
//! A `Document` owns an immutable tree of `DocumentNode`s. Every node carries
//! its absolute `NodePath` from the root and the 1-indexed source span it was
//! parsed from. Nodes built with the `scalar`/`sequence`/`mapping` helpers get
//! their paths assigned when wrapped by `Document::new`.

use serde::Serialize;
use serde_json::{Number, Value as Json};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
/// Source span of a node (1-indexed, end inclusive of the last character).
pub struct Position {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Position {
    pub const fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Document start; used for document-global findings.
    pub const fn start() -> Self {
        Self::new(1, 1, 1, 1)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
/// One step of a path: a mapping key or a sequence index.
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
/// Absolute location of a node, as the key sequence from the document root.
///
/// Rendered as `$` for the root, `.key` for simple keys, `["odd key"]` for
/// keys that are not identifier-like and `[n]` for indices.
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// New path extended by one segment.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segs = self.0.clone();
        segs.push(segment);
        Self(segs)
    }
}

impl From<Vec<PathSegment>> for NodePath {
    fn from(segs: Vec<PathSegment>) -> Self {
        Self(segs)
    }
}

impl FromIterator<PathSegment> for NodePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_simple_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.0 {
            match seg {
                PathSegment::Key(k) if is_simple_key(k) => write!(f, ".{}", k)?,
                PathSegment::Key(k) => write!(f, "[{}]", Json::String(k.clone()))?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Scalar => write!(f, "scalar"),
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::Mapping => write!(f, "mapping"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Primitive value held by a scalar node.
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    /// Primitive type name: null|boolean|integer|number|string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Scalar::Number(_) => "number",
            Scalar::String(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Scalar(Scalar),
    Sequence(Vec<DocumentNode>),
    Mapping(Vec<(String, DocumentNode)>),
}

#[derive(Debug, Clone, PartialEq)]
/// A node of the parsed tree. Read-only once owned by a `Document`.
pub struct DocumentNode {
    path: NodePath,
    position: Position,
    content: Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path {path} not found: {reason}")]
/// Navigation failed because a segment is absent or type-mismatched.
pub struct PathNotFound {
    pub path: NodePath,
    pub reason: String,
}

impl DocumentNode {
    pub fn scalar(value: Scalar, position: Position) -> Self {
        Self {
            path: NodePath::root(),
            position,
            content: Content::Scalar(value),
        }
    }

    pub fn sequence(items: Vec<DocumentNode>, position: Position) -> Self {
        Self {
            path: NodePath::root(),
            position,
            content: Content::Sequence(items),
        }
    }

    /// Mapping node; entry order is preserved as given.
    pub fn mapping(entries: Vec<(String, DocumentNode)>, position: Position) -> Self {
        Self {
            path: NodePath::root(),
            position,
            content: Content::Mapping(entries),
        }
    }

    pub(crate) fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn kind(&self) -> NodeKind {
        match self.content {
            Content::Scalar(_) => NodeKind::Scalar,
            Content::Sequence(_) => NodeKind::Sequence,
            Content::Mapping(_) => NodeKind::Mapping,
        }
    }

    /// Scalar value, `None` for containers.
    pub fn value(&self) -> Option<&Scalar> {
        match &self.content {
            Content::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Items of a sequence (empty for other kinds).
    pub fn items(&self) -> &[DocumentNode] {
        match &self.content {
            Content::Sequence(items) => items,
            _ => &[],
        }
    }

    /// Entries of a mapping in source order (empty for other kinds).
    pub fn entries(&self) -> &[(String, DocumentNode)] {
        match &self.content {
            Content::Mapping(entries) => entries,
            _ => &[],
        }
    }

    /// Direct children in source order, regardless of container kind.
    pub fn children(&self) -> Vec<&DocumentNode> {
        match &self.content {
            Content::Scalar(_) => Vec::new(),
            Content::Sequence(items) => items.iter().collect(),
            Content::Mapping(entries) => entries.iter().map(|(_, n)| n).collect(),
        }
    }

    /// Step into one child. The error's `path` is this node's path plus `segment`.
    pub fn get(&self, segment: &PathSegment) -> Result<&DocumentNode, PathNotFound> {
        let missing = |reason: String| PathNotFound {
            path: self.path.child(segment.clone()),
            reason,
        };
        match (&self.content, segment) {
            (Content::Mapping(entries), PathSegment::Key(key)) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, n)| n)
                .ok_or_else(|| missing(format!("no key '{}' in mapping", key))),
            (Content::Sequence(items), PathSegment::Index(i)) => items.get(*i).ok_or_else(|| {
                missing(format!(
                    "index {} out of bounds for sequence of length {}",
                    i,
                    items.len()
                ))
            }),
            (Content::Mapping(_), PathSegment::Index(i)) => {
                Err(missing(format!("cannot index mapping with {}", i)))
            }
            (Content::Sequence(_), PathSegment::Key(key)) => {
                Err(missing(format!("cannot look up key '{}' in sequence", key)))
            }
            (Content::Scalar(_), _) => Err(missing("scalar has no children".to_string())),
        }
    }

    /// Navigate from this node by a relative key sequence.
    pub fn resolve(&self, path: &[PathSegment]) -> Result<&DocumentNode, PathNotFound> {
        path.iter().try_fold(self, |node, seg| node.get(seg))
    }

    fn assign_paths(&mut self, path: NodePath) {
        match &mut self.content {
            Content::Scalar(_) => {}
            Content::Sequence(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    item.assign_paths(path.child(PathSegment::Index(i)));
                }
            }
            Content::Mapping(entries) => {
                for (key, node) in entries.iter_mut() {
                    node.assign_paths(path.child(PathSegment::Key(key.clone())));
                }
            }
        }
        self.path = path;
    }

    fn from_json(value: Json) -> Self {
        let pos = Position::start();
        match value {
            Json::Null => Self::scalar(Scalar::Null, pos),
            Json::Bool(b) => Self::scalar(Scalar::Bool(b), pos),
            Json::Number(n) => Self::scalar(Scalar::Number(n), pos),
            Json::String(s) => Self::scalar(Scalar::String(s), pos),
            Json::Array(items) => {
                Self::sequence(items.into_iter().map(Self::from_json).collect(), pos)
            }
            Json::Object(obj) => Self::mapping(
                obj.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect(),
                pos,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A whole parsed document. Owns its tree exclusively.
pub struct Document {
    root: DocumentNode,
}

impl Document {
    /// Wrap a tree, assigning every node its absolute path.
    pub fn new(mut root: DocumentNode) -> Self {
        root.assign_paths(NodePath::root());
        Self { root }
    }

    /// Build a document from a JSON value. No source spans are known, so
    /// every node sits at the document start.
    pub fn from_value(value: Json) -> Self {
        Self::new(DocumentNode::from_json(value))
    }

    pub fn root(&self) -> &DocumentNode {
        &self.root
    }

    pub fn resolve(&self, path: &[PathSegment]) -> Result<&DocumentNode, PathNotFound> {
        self.root.resolve(path)
    }
}
