//! In-memory C# workspace
//!
//! Holds projects, their parsed documents and referenced modules, and
//! answers semantic queries for the definition pipeline. Every buffer
//! mutation bumps the owning project's version.

pub mod diagnostics;
pub mod loader;
pub(crate) mod resolve;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

pub use diagnostics::ProjectDiagnostics;
pub use loader::load_workspace;

use crate::error::WorkspaceError;
use crate::infra::csharp::{CSharpParser, ParsedDocument};
use crate::models::diagnostic::Diagnostic;
use crate::models::metadata::MaterializedDocument;
use crate::models::module::{ExternalTypeRef, ModuleManifest};
use crate::models::project::{ChangeBufferRequest, ProjectId, ProjectInfo};
use crate::models::symbol::{Position, Symbol, SymbolId};
use crate::services::provider::{Document, DocumentOrigin, SemanticProvider};
use resolve::Binder;

pub(crate) struct ProjectState {
    pub id: ProjectId,
    pub name: String,
    pub file_path: PathBuf,
    pub version: u64,
    pub documents: BTreeMap<PathBuf, Arc<ParsedDocument>>,
    pub modules: Vec<Arc<ModuleManifest>>,
}

impl ProjectState {
    fn info(&self) -> ProjectInfo {
        ProjectInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            file_path: self.file_path.clone(),
            version: self.version,
            documents: self.documents.keys().cloned().collect(),
        }
    }

    fn analyze(&self) -> ProjectDiagnostics {
        let binder = Binder::new(self);
        let files = self
            .documents
            .iter()
            .map(|(path, doc)| {
                (
                    path.clone(),
                    diagnostics::document_diagnostics(&binder, path, doc),
                )
            })
            .collect();
        ProjectDiagnostics {
            project: self.id.clone(),
            project_file_path: self.file_path.clone(),
            version: self.version,
            files,
        }
    }
}

pub struct Workspace {
    projects: RwLock<BTreeMap<ProjectId, ProjectState>>,
    parser: CSharpParser,
}

impl Workspace {
    pub fn new() -> Result<Self, WorkspaceError> {
        Ok(Self {
            projects: RwLock::new(BTreeMap::new()),
            parser: CSharpParser::new()?,
        })
    }

    /// Register a project; its id is the project file path.
    pub async fn add_project(&self, name: impl Into<String>, file_path: impl Into<PathBuf>) -> ProjectId {
        let file_path = file_path.into();
        let id = ProjectId::new(file_path.to_string_lossy());
        let state = ProjectState {
            id: id.clone(),
            name: name.into(),
            file_path,
            version: 0,
            documents: BTreeMap::new(),
            modules: Vec::new(),
        };
        self.projects.write().await.insert(id.clone(), state);
        id
    }

    pub async fn add_document(
        &self,
        project: &ProjectId,
        path: impl Into<PathBuf>,
        text: &str,
    ) -> Result<(), WorkspaceError> {
        let path = path.into();
        let parsed = self.parser.parse(&path, text)?;
        let mut projects = self.projects.write().await;
        let state = projects
            .get_mut(project)
            .ok_or_else(|| WorkspaceError::ProjectNotFound(project.to_string()))?;
        state.documents.insert(path, Arc::new(parsed));
        state.version += 1;
        Ok(())
    }

    pub async fn add_module(
        &self,
        project: &ProjectId,
        manifest: ModuleManifest,
    ) -> Result<(), WorkspaceError> {
        let mut projects = self.projects.write().await;
        let state = projects
            .get_mut(project)
            .ok_or_else(|| WorkspaceError::ProjectNotFound(project.to_string()))?;
        state.modules.push(Arc::new(manifest));
        state.version += 1;
        Ok(())
    }

    /// Replace a document's whole text.
    pub async fn update_buffer(&self, path: &Path, text: &str) -> Result<ProjectId, WorkspaceError> {
        let mut projects = self.projects.write().await;
        let state = projects
            .values_mut()
            .find(|p| p.documents.contains_key(path))
            .ok_or_else(|| WorkspaceError::DocumentNotFound(path.to_path_buf()))?;
        let parsed = self.parser.parse(path, text)?;
        state.documents.insert(path.to_path_buf(), Arc::new(parsed));
        state.version += 1;
        tracing::debug!("{} updated, {} now at version {}", path.display(), state.name, state.version);
        Ok(state.id.clone())
    }

    /// Apply a ranged edit to a document.
    pub async fn change_buffer(&self, request: &ChangeBufferRequest) -> Result<ProjectId, WorkspaceError> {
        let path = request.file_path.as_path();
        let mut projects = self.projects.write().await;
        let state = projects
            .values_mut()
            .find(|p| p.documents.contains_key(path))
            .ok_or_else(|| WorkspaceError::DocumentNotFound(path.to_path_buf()))?;
        let current = state
            .documents
            .get(path)
            .ok_or_else(|| WorkspaceError::DocumentNotFound(path.to_path_buf()))?;
        let text = apply_change(current, request)?;
        let parsed = self.parser.parse(path, &text)?;
        state.documents.insert(path.to_path_buf(), Arc::new(parsed));
        state.version += 1;
        tracing::debug!("{} edited, {} now at version {}", path.display(), state.name, state.version);
        Ok(state.id.clone())
    }

    /// Project owning a document, or whose project file is `path`.
    pub async fn project_for_path(&self, path: &Path) -> Option<ProjectId> {
        let projects = self.projects.read().await;
        projects
            .values()
            .find(|p| p.file_path == path || p.documents.contains_key(path))
            .map(|p| p.id.clone())
    }

    pub async fn projects(&self) -> Vec<ProjectInfo> {
        self.projects.read().await.values().map(ProjectState::info).collect()
    }

    pub async fn analyze_project(&self, project: &ProjectId) -> Result<ProjectDiagnostics, WorkspaceError> {
        let projects = self.projects.read().await;
        let state = projects
            .get(project)
            .ok_or_else(|| WorkspaceError::ProjectNotFound(project.to_string()))?;
        Ok(state.analyze())
    }

    pub async fn diagnostics_for(&self, path: &Path) -> Result<Vec<Diagnostic>, WorkspaceError> {
        let projects = self.projects.read().await;
        let state = projects
            .values()
            .find(|p| p.documents.contains_key(path))
            .ok_or_else(|| WorkspaceError::DocumentNotFound(path.to_path_buf()))?;
        let doc = state
            .documents
            .get(path)
            .ok_or_else(|| WorkspaceError::DocumentNotFound(path.to_path_buf()))?;
        Ok(diagnostics::document_diagnostics(&Binder::new(state), path, doc))
    }
}

fn apply_change(doc: &ParsedDocument, request: &ChangeBufferRequest) -> Result<String, WorkspaceError> {
    let start = Position::new(request.start_line, request.start_column);
    let end = Position::new(request.end_line, request.end_column);
    let offset = |position: Position| {
        doc.lines.offset(&doc.text, position).ok_or_else(|| {
            WorkspaceError::InvalidEdit(format!(
                "{} is outside {}",
                position,
                request.file_path.display()
            ))
        })
    };
    let (start_byte, end_byte) = (offset(start)?, offset(end)?);
    if end_byte < start_byte {
        return Err(WorkspaceError::InvalidEdit(format!(
            "range end {} precedes start {}",
            end, start
        )));
    }
    let mut text = doc.text.to_string();
    text.replace_range(start_byte..end_byte, &request.new_text);
    Ok(text)
}

/// Declared symbol of a synthesized document's anchor.
fn anchored_symbol(
    binder: &Binder<'_>,
    document: &MaterializedDocument,
    id: &SymbolId,
) -> Option<Symbol> {
    let external = binder.external(Some(&document.key.module), &document.key.type_name)?;
    let ty = external.ty();
    if ty.symbol_id() == *id {
        return Some(external.type_symbol());
    }
    let full_name = ty.full_name();
    ty.members
        .iter()
        .find(|m| m.symbol_id(&full_name) == *id)
        .map(|m| external.member_symbol(m))
}

#[async_trait]
impl SemanticProvider for Workspace {
    async fn document(&self, path: &Path) -> Option<Document> {
        let projects = self.projects.read().await;
        projects.values().find_map(|state| {
            let parsed = state.documents.get(path)?;
            Some(Document {
                path: path.to_path_buf(),
                project: state.id.clone(),
                project_name: state.name.clone(),
                text: parsed.text.clone(),
                origin: DocumentOrigin::Workspace,
            })
        })
    }

    async fn symbol_at(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Option<Symbol>, WorkspaceError> {
        let projects = self.projects.read().await;
        let state = projects
            .get(&document.project)
            .ok_or_else(|| WorkspaceError::ProjectNotFound(document.project.to_string()))?;
        let binder = Binder::new(state);

        match &document.origin {
            DocumentOrigin::Workspace => {
                let parsed = state
                    .documents
                    .get(&document.path)
                    .ok_or_else(|| WorkspaceError::DocumentNotFound(document.path.clone()))?;
                Ok(binder.symbol_at(&document.path, parsed, position))
            }
            DocumentOrigin::Metadata(materialized) => {
                if let Some(anchor) = materialized.anchor_at(position) {
                    return Ok(anchored_symbol(&binder, materialized, &anchor.id));
                }
                let parsed = self.parser.parse(&document.path, &document.text)?;
                Ok(binder.metadata_symbol_at(&parsed, position))
            }
        }
    }

    async fn external_type(
        &self,
        project: &ProjectId,
        module: Option<&str>,
        type_name: &str,
    ) -> Option<ExternalTypeRef> {
        let projects = self.projects.read().await;
        let state = projects.get(project)?;
        Binder::new(state).external(module, type_name)
    }

    async fn project(&self, id: &ProjectId) -> Option<ProjectInfo> {
        self.projects.read().await.get(id).map(ProjectState::info)
    }

    async fn project_named(&self, name: &str) -> Option<ProjectInfo> {
        self.projects
            .read()
            .await
            .values()
            .find(|p| p.name == name)
            .map(ProjectState::info)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::workspace;
    use super::*;
    use crate::models::symbol::{Location, SymbolKind};
    use crate::services::metadata::strategy::tests::manifest;

    async fn symbol(ws: &Workspace, path: &str, line: u32, column: u32) -> Option<Symbol> {
        let doc = ws.document(Path::new(path)).await.unwrap();
        ws.symbol_at(&doc, Position::new(line, column)).await.unwrap()
    }

    #[tokio::test]
    async fn test_member_access_through_local_reaches_module() {
        let source = r#"using Acme.Text;
namespace App {
  class Program {
    void Run() {
      var foo = new Foo();
      foo.Bar(1, 2);
    }
  }
}
"#;
        let (ws, _) = workspace(&[("/ws/a.cs", source)], vec![manifest(true)]).await;

        let bar = symbol(&ws, "/ws/a.cs", 5, 10).await.unwrap();
        assert_eq!(bar.id.as_str(), "M:Acme.Text.Foo.Bar(int,int)");
        assert_eq!(
            bar.primary_location(),
            Some(&Location::in_module("Acme.Core", "Acme.Text.Foo"))
        );

        let foo = symbol(&ws, "/ws/a.cs", 4, 20).await.unwrap();
        assert_eq!(foo.id.as_str(), "T:Acme.Text.Foo");
    }

    #[tokio::test]
    async fn test_partial_definition_carries_implementation() {
        let a = "partial class W\n{\n    partial void Hook(int x);\n    void Call() { Hook(1); }\n}\n";
        let b = "partial class W\n{\n    partial void Hook(int x) { }\n}\n";
        let (ws, _) = workspace(&[("/ws/a.cs", a), ("/ws/b.cs", b)], vec![]).await;

        let hook = symbol(&ws, "/ws/a.cs", 3, 18).await.unwrap();
        assert_eq!(hook.kind, SymbolKind::Method);
        assert_eq!(
            hook.primary_location(),
            Some(&Location::in_source("/ws/a.cs", Position::new(2, 17)))
        );
        let implementation = hook.partial_implementation.unwrap();
        assert_eq!(
            implementation.primary_location(),
            Some(&Location::in_source("/ws/b.cs", Position::new(2, 17)))
        );
    }

    #[tokio::test]
    async fn test_partial_type_lists_every_declaration() {
        let a = "partial class W { }\nclass U { W w; }\n";
        let b = "partial class W { }\n";
        let (ws, _) = workspace(&[("/ws/a.cs", a), ("/ws/b.cs", b)], vec![]).await;

        let w = symbol(&ws, "/ws/a.cs", 1, 10).await.unwrap();
        assert_eq!(w.locations.len(), 2);
        assert_eq!(
            w.primary_location(),
            Some(&Location::in_source("/ws/a.cs", Position::new(0, 14)))
        );
    }

    #[tokio::test]
    async fn test_property_accessor_is_associated_with_property() {
        let (ws, _) = workspace(
            &[("/ws/a.cs", "class P { public int Count { get; set; } }")],
            vec![],
        )
        .await;

        let get = symbol(&ws, "/ws/a.cs", 0, 29).await.unwrap();
        assert_eq!(get.name, "get_Count");
        assert!(get.is_property_accessor());
    }

    #[tokio::test]
    async fn test_namespace_names_resolve_to_namespaces() {
        let (ws, _) = workspace(
            &[("/ws/a.cs", "namespace App.Core { class A { } }")],
            vec![],
        )
        .await;

        let ns = symbol(&ws, "/ws/a.cs", 0, 14).await.unwrap();
        assert_eq!(ns.kind, SymbolKind::Namespace);
        assert_eq!(ns.id.as_str(), "N:App.Core");
    }

    #[tokio::test]
    async fn test_parameter_reference_finds_declaration() {
        let source = "class A\n{\n    int M(int value) { return value; }\n}\n";
        let (ws, _) = workspace(&[("/ws/a.cs", source)], vec![]).await;

        let value = symbol(&ws, "/ws/a.cs", 2, 30).await.unwrap();
        assert_eq!(value.kind, SymbolKind::Parameter);
        assert_eq!(
            value.primary_location(),
            Some(&Location::in_source("/ws/a.cs", Position::new(2, 14)))
        );
    }

    #[tokio::test]
    async fn test_inherited_member_resolves_through_base_list() {
        let source = "class Base { public void Go() { } }\nclass Derived : Base { void M() { Go(); } }\n";
        let (ws, _) = workspace(&[("/ws/a.cs", source)], vec![]).await;

        let go = symbol(&ws, "/ws/a.cs", 1, 34).await.unwrap();
        assert_eq!(go.id.as_str(), "M:Base.Go()");
        assert_eq!(
            go.primary_location(),
            Some(&Location::in_source("/ws/a.cs", Position::new(0, 25)))
        );
    }

    #[tokio::test]
    async fn test_whitespace_has_no_symbol() {
        let (ws, _) = workspace(&[("/ws/a.cs", "class A { }\n\n")], vec![]).await;
        assert!(symbol(&ws, "/ws/a.cs", 0, 9).await.is_none());
    }

    #[tokio::test]
    async fn test_change_buffer_edits_and_bumps_version() {
        let (ws, project) = workspace(&[("/ws/a.cs", "class A { }\n")], vec![]).await;
        let before = ws.project(&project).await.unwrap().version;

        let request = ChangeBufferRequest {
            file_path: PathBuf::from("/ws/a.cs"),
            start_line: 0,
            start_column: 6,
            end_line: 0,
            end_column: 7,
            new_text: "Renamed".to_string(),
        };
        ws.change_buffer(&request).await.unwrap();

        let doc = ws.document(Path::new("/ws/a.cs")).await.unwrap();
        assert_eq!(&*doc.text, "class Renamed { }\n");
        assert_eq!(ws.project(&project).await.unwrap().version, before + 1);
    }

    #[tokio::test]
    async fn test_change_buffer_rejects_range_outside_document() {
        let (ws, _) = workspace(&[("/ws/a.cs", "class A { }\n")], vec![]).await;
        let request = ChangeBufferRequest {
            file_path: PathBuf::from("/ws/a.cs"),
            start_line: 4,
            start_column: 0,
            end_line: 4,
            end_column: 1,
            new_text: String::new(),
        };
        assert!(matches!(
            ws.change_buffer(&request).await,
            Err(WorkspaceError::InvalidEdit(_))
        ));
    }

    #[tokio::test]
    async fn test_unresolved_type_is_reported() {
        let source = "class A { Missing m; B b; }\nclass B { }\n";
        let (ws, _) = workspace(&[("/ws/a.cs", source)], vec![]).await;

        let diagnostics = ws.diagnostics_for(Path::new("/ws/a.cs")).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code.as_deref(), Some("CS0246"));
        assert!(diagnostics[0].message.contains("'Missing'"));
        assert_eq!(diagnostics[0].start, Position::new(0, 10));
    }

    #[tokio::test]
    async fn test_framework_types_without_manifest_are_not_reported() {
        let source = "using System.Text;\nclass Box<T> { T v; System.String s; StringBuilder b; Missing m; }\n";
        let (ws, _) = workspace(&[("/ws/a.cs", source)], vec![]).await;

        let diagnostics = ws.diagnostics_for(Path::new("/ws/a.cs")).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'Missing'"));
    }

    #[tokio::test]
    async fn test_loaded_framework_namespace_is_still_checked() {
        let system: ModuleManifest = serde_json::from_value(serde_json::json!({
            "name": "System.Runtime",
            "types": [{ "namespace": "System", "name": "String" }]
        }))
        .unwrap();
        let source = "class A { System.String s; System.Strng t; }\n";
        let (ws, _) = workspace(&[("/ws/a.cs", source)], vec![system]).await;

        let diagnostics = ws.diagnostics_for(Path::new("/ws/a.cs")).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("'System.Strng'"));
    }

    #[tokio::test]
    async fn test_missing_semicolon_is_reported() {
        let (ws, _) = workspace(
            &[("/ws/a.cs", "class A { void M() { int x = 1 } }")],
            vec![],
        )
        .await;
        let diagnostics = ws.diagnostics_for(Path::new("/ws/a.cs")).await.unwrap();
        assert!(!diagnostics.is_empty());
        assert!(diagnostics.iter().all(|d| d.code.as_deref() != Some("CS0246")));
    }
}
