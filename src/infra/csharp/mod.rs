//! C# parsing infrastructure
//!
//! Tree-sitter based parsing of workspace and synthesized documents.

pub mod syntax;

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tree_sitter::{Node, Parser, Point, Tree};

pub use syntax::{
    AccessorDecl, DocumentIndex, MemberDecl, ParameterDecl, SyntaxIssue, TypeDecl, TypeReference,
};

use crate::error::WorkspaceError;
use crate::models::symbol::Position;

pub struct CSharpParser {
    parser: Mutex<Parser>,
}

impl CSharpParser {
    pub fn new() -> Result<Self, WorkspaceError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .map_err(|e| WorkspaceError::Grammar(e.to_string()))?;
        Ok(Self {
            parser: Mutex::new(parser),
        })
    }

    pub fn parse(&self, path: &Path, text: &str) -> Result<ParsedDocument, WorkspaceError> {
        let tree = {
            let mut parser = self.parser.lock().unwrap_or_else(PoisonError::into_inner);
            parser.parse(text, None)
        }
        .ok_or_else(|| WorkspaceError::Parse(path.to_path_buf()))?;

        let lines = LineIndex::new(text);
        let index = DocumentIndex::build(&tree, text, &lines);
        Ok(ParsedDocument {
            text: Arc::from(text),
            tree,
            lines,
            index,
        })
    }
}

/// A parsed document with its declaration index.
pub struct ParsedDocument {
    pub text: Arc<str>,
    pub tree: Tree,
    pub lines: LineIndex,
    pub index: DocumentIndex,
}

impl ParsedDocument {
    /// Smallest node (named or not) covering `position`.
    pub fn node_at(&self, position: Position) -> Option<Node<'_>> {
        let point = self.lines.point(&self.text, position)?;
        self.tree
            .root_node()
            .descendant_for_point_range(point, point)
    }

    pub fn node_text(&self, node: Node<'_>) -> &str {
        node_text(node, &self.text)
    }

    pub fn position(&self, point: Point) -> Position {
        self.lines.position(&self.text, point)
    }
}

/// Byte offsets of line starts; converts between editor and tree-sitter coordinates.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line<'a>(&self, text: &'a str, row: usize) -> Option<&'a str> {
        let start = *self.starts.get(row)?;
        let end = self
            .starts
            .get(row + 1)
            .map(|next| next - 1)
            .unwrap_or(text.len());
        text.get(start..end)
    }

    /// Character column to byte column. `None` past the end of the line.
    pub fn point(&self, text: &str, position: Position) -> Option<Point> {
        let row = position.line as usize;
        let line = self.line(text, row)?;
        let column = position.column as usize;
        let byte = match line.char_indices().nth(column) {
            Some((byte, _)) => byte,
            None if line.chars().count() == column => line.len(),
            None => return None,
        };
        Some(Point::new(row, byte))
    }

    /// Absolute byte offset of `position`.
    pub fn offset(&self, text: &str, position: Position) -> Option<usize> {
        let point = self.point(text, position)?;
        Some(self.starts[point.row] + point.column)
    }

    pub fn position(&self, text: &str, point: Point) -> Position {
        let column = self
            .line(text, point.row)
            .and_then(|line| line.get(..point.column.min(line.len())))
            .map(|prefix| prefix.chars().count())
            .unwrap_or(point.column);
        Position::new(point.row as u32, column as u32)
    }
}

pub fn node_text<'a>(node: Node<'_>, text: &'a str) -> &'a str {
    text.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_count_characters() {
        let text = "// é\nvar ü = 1;\n";
        let lines = LineIndex::new(text);
        let point = lines.point(text, Position::new(1, 4)).unwrap();
        assert_eq!(point, Point::new(1, 4));
        let after = lines.point(text, Position::new(1, 6)).unwrap();
        assert_eq!(after, Point::new(1, 7));
        assert_eq!(lines.position(text, after), Position::new(1, 6));
        assert!(lines.point(text, Position::new(0, 40)).is_none());
        assert!(lines.point(text, Position::new(9, 0)).is_none());
    }

    #[test]
    fn test_node_at_finds_identifier() {
        let parser = CSharpParser::new().unwrap();
        let doc = parser
            .parse(Path::new("a.cs"), "class Foo { void Bar() {} }")
            .unwrap();
        let node = doc.node_at(Position::new(0, 18)).unwrap();
        assert_eq!(node.kind(), "identifier");
        assert_eq!(doc.node_text(node), "Bar");
    }
}
