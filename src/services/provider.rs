//! Semantic provider seam
//!
//! The definition pipeline never binds code itself. It asks a provider for
//! documents, for the symbol under a position and for the compiled types a
//! project can see.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkspaceError;
use crate::models::metadata::MaterializedDocument;
use crate::models::module::ExternalTypeRef;
use crate::models::project::{ProjectId, ProjectInfo};
use crate::models::symbol::{Position, Symbol};

/// Where a document came from.
#[derive(Debug, Clone)]
pub enum DocumentOrigin {
    /// An editable workspace file.
    Workspace,
    /// A synthesized view of an external type.
    Metadata(Arc<MaterializedDocument>),
}

/// A document the provider can answer questions about.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub project: ProjectId,
    pub project_name: String,
    pub text: Arc<str>,
    pub origin: DocumentOrigin,
}

impl Document {
    pub fn from_metadata(document: Arc<MaterializedDocument>) -> Self {
        Self {
            path: document.path.clone(),
            project: document.key.project.clone(),
            project_name: document.project_name.clone(),
            text: Arc::from(document.text.as_str()),
            origin: DocumentOrigin::Metadata(document),
        }
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self.origin, DocumentOrigin::Metadata(_))
    }
}

#[async_trait]
pub trait SemanticProvider: Send + Sync {
    /// Look up an editable document by path.
    async fn document(&self, path: &Path) -> Option<Document>;

    /// Symbol referenced or declared at `position`, if any.
    async fn symbol_at(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Option<Symbol>, WorkspaceError>;

    /// Compiled type visible from `project`, optionally restricted to one module.
    async fn external_type(
        &self,
        project: &ProjectId,
        module: Option<&str>,
        type_name: &str,
    ) -> Option<ExternalTypeRef>;

    async fn project(&self, id: &ProjectId) -> Option<ProjectInfo>;

    async fn project_named(&self, name: &str) -> Option<ProjectInfo>;
}
