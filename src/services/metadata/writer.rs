//! Indented text builder that remembers where declared names land

use crate::models::metadata::SymbolAnchor;
use crate::models::symbol::{Position, SymbolId};

const INDENT: &str = "    ";

/// Output of a synthesizer: the document text plus one anchor per declared name.
#[derive(Debug, Clone, Default)]
pub struct SynthesizedText {
    pub text: String,
    pub anchors: Vec<SymbolAnchor>,
}

#[derive(Debug, Default)]
pub struct SourceWriter {
    text: String,
    line: u32,
    depth: usize,
    anchors: Vec<SymbolAnchor>,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, content: &str) {
        if content.is_empty() {
            self.text.push('\n');
        } else {
            for _ in 0..self.depth {
                self.text.push_str(INDENT);
            }
            self.text.push_str(content);
            self.text.push('\n');
        }
        self.line += 1;
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    /// Write `header`, then an opening brace, and indent what follows.
    pub fn open(&mut self, header: &str) {
        self.line(header);
        self.line("{");
        self.depth += 1;
    }

    /// Like [`open`](Self::open), anchoring `name` inside the header.
    pub fn open_declared(&mut self, prefix: &str, name: &str, suffix: &str, id: SymbolId) {
        self.declare(prefix, name, suffix, id);
        self.line("{");
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Write `prefix name suffix` on one line and anchor `id` at `name`.
    pub fn declare(&mut self, prefix: &str, name: &str, suffix: &str, id: SymbolId) {
        let column = (self.depth * INDENT.len() + prefix.chars().count()) as u32;
        self.anchors.push(SymbolAnchor {
            id,
            name: name.to_string(),
            position: Position::new(self.line, column),
        });
        self.line(&format!("{}{}{}", prefix, name, suffix));
    }

    pub fn finish(self) -> SynthesizedText {
        SynthesizedText {
            text: self.text,
            anchors: self.anchors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_points_at_declared_name() {
        let mut writer = SourceWriter::new();
        writer.line("// header");
        writer.open("namespace Acme");
        writer.declare("public class ", "Foo", "", SymbolId::for_type("Acme.Foo"));
        writer.close();

        let out = writer.finish();
        let anchor = &out.anchors[0];
        assert_eq!(anchor.position, Position::new(3, 17));

        let line = out.text.lines().nth(3).unwrap();
        let column = anchor.position.column as usize;
        assert_eq!(&line[column..column + 3], "Foo");
    }

    #[test]
    fn test_close_never_underflows() {
        let mut writer = SourceWriter::new();
        writer.close();
        writer.line("x");
        assert_eq!(writer.finish().text, "}\nx\n");
    }
}
