//! Diagnostic and re-analysis models

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::symbol::Position;

/// Compiler code reported for a type name that does not resolve.
pub const UNRESOLVED_TYPE_CODE: &str = "CS0246";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file_path: PathBuf,
    pub start: Position,
    pub end: Position,
    pub severity: DiagnosticSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(file_path: PathBuf, start: Position, end: Position, message: String) -> Self {
        Self {
            file_path,
            start,
            end,
            severity: DiagnosticSeverity::Error,
            message,
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn display_line(&self) -> u32 {
        self.start.line + 1
    }

    pub fn display_column(&self) -> u32 {
        self.start.column + 1
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({},{}): {}",
            self.file_path.display(),
            self.display_line(),
            self.display_column(),
            self.severity
        )?;
        if let Some(code) = &self.code {
            write!(f, " {}", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Severity levels (LSP numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Information => write!(f, "info"),
            Self::Hint => write!(f, "hint"),
        }
    }
}

/// Ask for diagnostics to be recomputed, optionally for one project only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReAnalyzeRequest {
    /// Any file of the project to re-analyze, or the project file itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_open_file_path_as_context: Option<PathBuf>,
}

impl ReAnalyzeRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            current_open_file_path_as_context: Some(path.into()),
        }
    }
}

/// Emitted once per project after its diagnostics were recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalyzed {
    pub project_file_path: PathBuf,
}
