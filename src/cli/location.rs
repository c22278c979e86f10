//! `file:line[:column]` arguments
//!
//! Lines and columns are 1-based on the command line and zero-based in
//! requests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::models::symbol::Position;

const USAGE: &str = "Expected: file:line[:column]\nExample: src/Program.cs:12:9";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl ParsedLocation {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Location cannot be empty");
        }
        let (file, rest) = split_path(input)?;
        let (line, column) = parse_position(rest)?;
        Ok(Self {
            file: PathBuf::from(file),
            line,
            column,
        })
    }

    /// Canonical path of the file, which must lie under `root`.
    pub fn resolve(&self, root: &Path) -> Result<Self> {
        let file = if self.file.is_absolute() {
            self.file.clone()
        } else {
            root.join(&self.file)
        };
        let canonical = file
            .canonicalize()
            .map_err(|_| anyhow::anyhow!("File not found: {}", file.display()))?;
        let root = root
            .canonicalize()
            .context("Failed to resolve workspace root")?;
        if !canonical.starts_with(&root) {
            bail!(
                "Access denied: {} is outside the workspace",
                self.file.display()
            );
        }
        Ok(Self {
            file: canonical,
            ..self.clone()
        })
    }

    /// Zero-based editor position.
    pub fn position(&self) -> Position {
        Position::new(self.line - 1, self.column - 1)
    }

    pub fn validate_position_with_content(&self, content: &str) -> Result<()> {
        let lines: Vec<&str> = content.lines().collect();
        let line_count = lines.len().max(1);
        if self.line as usize > line_count {
            bail!("Line {} exceeds file length ({} lines)", self.line, line_count);
        }
        if let Some(text) = lines.get((self.line - 1) as usize) {
            let chars = text.chars().count();
            if self.column as usize > chars + 1 {
                bail!(
                    "Column {} exceeds line length ({} chars) at line {}",
                    self.column,
                    chars,
                    self.line
                );
            }
        }
        Ok(())
    }
}

/// Split at the first `:` followed by a digit, skipping a drive letter.
fn split_path(input: &str) -> Result<(&str, &str)> {
    let bytes = input.as_bytes();
    let start = if bytes.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        2
    } else {
        0
    };
    for (idx, ch) in input[start..].char_indices() {
        if ch != ':' {
            continue;
        }
        let at = start + idx;
        match input[at + 1..].chars().next() {
            Some(c) if c.is_ascii_digit() => return Ok((&input[..at], &input[at + 1..])),
            Some('-') => bail!("Invalid line number: negative values not allowed.\n{}", USAGE),
            _ => {}
        }
    }
    bail!("Invalid location format. {}", USAGE)
}

fn parse_position(rest: &str) -> Result<(u32, u32)> {
    let mut parts = rest.splitn(2, ':');
    let line_str = parts.next().unwrap_or_default();
    let line: u32 = line_str
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid line number '{}': must be a positive integer", line_str))?;
    let column: u32 = match parts.next() {
        Some(col_str) => col_str.parse().map_err(|_| {
            anyhow::anyhow!("Invalid column number '{}': must be a positive integer", col_str)
        })?,
        None => 1,
    };
    if line == 0 {
        bail!("Line number must be >= 1 (got 0)");
    }
    if column == 0 {
        bail!("Column number must be >= 1 (got 0)");
    }
    Ok((line, column))
}

impl std::fmt::Display for ParsedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}
