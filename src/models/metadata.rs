//! Materialized metadata documents
//!
//! A materialized document is the synthesized, best-effort source view of
//! a type that lives in a compiled module.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::project::ProjectId;
use super::symbol::{Position, SymbolId};

/// Root segment of every synthesized document path.
pub const METADATA_ROOT: &str = "$metadata$";

/// How an external type is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    /// Full reconstruction including member bodies.
    Decompile,
    /// Declarations only. Always available.
    #[default]
    StubFromSignature,
}

impl fmt::Display for SynthesisStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decompile => write!(f, "decompile"),
            Self::StubFromSignature => write!(f, "stub"),
        }
    }
}

/// Cache key of a materialized document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub project: ProjectId,
    pub module: String,
    pub type_name: String,
}

impl MetadataKey {
    pub fn new(project: ProjectId, module: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            project,
            module: module.into(),
            type_name: type_name.into(),
        }
    }

    /// Virtual path the editor uses to refer to the synthesized document.
    pub fn document_path(&self, project_name: &str) -> PathBuf {
        let mut path = PathBuf::from(METADATA_ROOT)
            .join("Project")
            .join(project_name)
            .join("Assembly")
            .join(&self.module)
            .join("Symbol");
        let mut segments: Vec<&str> = self.type_name.split('.').collect();
        let file_stem = segments.pop().unwrap_or_default();
        for segment in segments {
            path.push(segment);
        }
        path.push(format!("{}.cs", file_stem));
        path
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.project, self.module, self.type_name)
    }
}

/// Identifies a synthesized document to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSource {
    pub module_name: String,
    pub project_name: String,
    pub type_name: String,
}

/// Ask for the text of a synthesized document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSourceRequest {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    pub type_name: String,
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: u64,
}

fn default_timeout_millis() -> u64 {
    crate::config::default_timeout().as_millis() as u64
}

impl From<MetadataSource> for MetadataSourceRequest {
    fn from(source: MetadataSource) -> Self {
        Self {
            project_name: source.project_name,
            module_name: Some(source.module_name),
            type_name: source.type_name,
            timeout_millis: default_timeout_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSourceResponse {
    pub source_name: String,
    pub source: String,
}

/// Where a symbol's name was written in a synthesized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAnchor {
    pub id: SymbolId,
    pub name: String,
    pub position: Position,
}

impl SymbolAnchor {
    fn covers(&self, position: Position) -> bool {
        let width = self.name.chars().count() as u32;
        self.position.line == position.line
            && position.column >= self.position.column
            && position.column < self.position.column + width.max(1)
    }
}

#[derive(Debug, Clone)]
pub struct MaterializedDocument {
    pub key: MetadataKey,
    pub project_name: String,
    pub path: PathBuf,
    pub text: String,
    pub strategy: SynthesisStrategy,
    /// Project snapshot this document was produced for.
    pub snapshot: u64,
    pub anchors: Vec<SymbolAnchor>,
}

impl MaterializedDocument {
    pub fn anchor(&self, id: &SymbolId) -> Option<&SymbolAnchor> {
        self.anchors.iter().find(|a| &a.id == id)
    }

    pub fn anchor_at(&self, position: Position) -> Option<&SymbolAnchor> {
        self.anchors.iter().find(|a| a.covers(position))
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.text.lines().nth(line as usize)
    }

    pub fn source(&self) -> MetadataSource {
        MetadataSource {
            module_name: self.key.module.clone(),
            project_name: self.project_name.clone(),
            type_name: self.key.type_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_layout() {
        let key = MetadataKey::new(ProjectId::new("/ws/app.csproj"), "Acme.Core", "Acme.Text.Foo");
        let path = key.document_path("app");
        assert_eq!(
            path,
            PathBuf::from("$metadata$/Project/app/Assembly/Acme.Core/Symbol/Acme/Text/Foo.cs")
        );
    }

    #[test]
    fn test_anchor_lookup_by_position() {
        let anchor = SymbolAnchor {
            id: SymbolId::for_type("Foo"),
            name: "Foo".to_string(),
            position: Position::new(4, 17),
        };
        let doc = MaterializedDocument {
            key: MetadataKey::new(ProjectId::new("p"), "m", "Foo"),
            project_name: "p".to_string(),
            path: PathBuf::from("x.cs"),
            text: String::new(),
            strategy: SynthesisStrategy::StubFromSignature,
            snapshot: 0,
            anchors: vec![anchor],
        };
        assert!(doc.anchor_at(Position::new(4, 17)).is_some());
        assert!(doc.anchor_at(Position::new(4, 19)).is_some());
        assert!(doc.anchor_at(Position::new(4, 20)).is_none());
        assert!(doc.anchor_at(Position::new(3, 17)).is_none());
    }

    #[test]
    fn test_metadata_source_is_camel_case() {
        let source = MetadataSource {
            module_name: "Acme.Core".into(),
            project_name: "app".into(),
            type_name: "Acme.Foo".into(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["moduleName"], "Acme.Core");
        assert_eq!(json["typeName"], "Acme.Foo");
    }
}
