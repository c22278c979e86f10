//! Response types for CLI output
//!
//! Positions are printed 1-based; paths inside the root are relative.

use serde::Serialize;

use crate::models::diagnostic::Diagnostic;
use crate::models::metadata::MetadataSource;

/// Location in a file (relative path by default)
#[derive(Debug, Clone, Serialize)]
pub struct LocationOutput {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl LocationOutput {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// Response for def command
#[derive(Debug, Serialize)]
pub struct DefinitionOutput {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<LocationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_source: Option<MetadataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DefinitionOutput {
    pub fn not_found() -> Self {
        Self {
            found: false,
            definition: None,
            metadata_source: None,
            source: None,
        }
    }
}

/// Response for source command
#[derive(Debug, Serialize)]
pub struct SourceOutput {
    pub source_name: String,
    pub lines: usize,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticOutput {
    pub severity: String,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&Diagnostic> for DiagnosticOutput {
    fn from(d: &Diagnostic) -> Self {
        Self {
            severity: d.severity.to_string(),
            message: d.message.clone(),
            line: d.display_line(),
            column: d.display_column(),
            end_line: d.end.line + 1,
            end_column: d.end.column + 1,
            code: d.code.clone(),
        }
    }
}

/// Response for diagnostics command
#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub file: String,
    pub count: usize,
    pub diagnostics: Vec<DiagnosticOutput>,
}

/// Response for reanalyze command
#[derive(Debug, Serialize)]
pub struct ReanalyzeResponse {
    pub count: usize,
    pub projects: Vec<String>,
}
