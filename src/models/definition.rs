//! Go-to-definition request and response shapes

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::metadata::MetadataSource;
use super::symbol::Position;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionRequest {
    pub file_path: PathBuf,
    pub line: u32,
    pub column: u32,
    /// Opt in to materializing documents for external symbols.
    #[serde(default)]
    pub want_metadata: bool,
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: u64,
}

fn default_timeout_millis() -> u64 {
    crate::config::default_timeout().as_millis() as u64
}

impl DefinitionRequest {
    pub fn new(file_path: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            column,
            want_metadata: false,
            timeout_millis: default_timeout_millis(),
        }
    }

    pub fn with_metadata(mut self, want_metadata: bool) -> Self {
        self.want_metadata = want_metadata;
        self
    }

    pub fn with_timeout(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// `{}`, `{fileName, line, column}` or `{line, column, metadataSource}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_source: Option<MetadataSource>,
}

impl DefinitionResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn source(file_name: impl Into<String>, position: Position) -> Self {
        Self {
            file_name: Some(file_name.into()),
            line: Some(position.line),
            column: Some(position.column),
            metadata_source: None,
        }
    }

    pub fn metadata(position: Position, source: MetadataSource) -> Self {
        Self {
            file_name: None,
            line: Some(position.line),
            column: Some(position.column),
            metadata_source: Some(source),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.metadata_source.is_none()
    }

    pub fn position(&self) -> Option<Position> {
        Some(Position::new(self.line?, self.column?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response_serializes_to_empty_object() {
        let json = serde_json::to_string(&DefinitionResponse::empty()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_source_response_shape() {
        let response = DefinitionResponse::source("/ws/a.cs", Position::new(3, 4));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["fileName"], "/ws/a.cs");
        assert_eq!(json["line"], 3);
        assert!(json.get("metadataSource").is_none());
    }

    #[test]
    fn test_request_defaults() {
        let request: DefinitionRequest =
            serde_json::from_str(r#"{"filePath": "a.cs", "line": 1, "column": 2}"#).unwrap();
        assert!(!request.want_metadata);
        assert!(request.timeout_millis > 0);
        assert_eq!(request.position(), Position::new(1, 2));
    }
}
